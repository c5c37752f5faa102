pub mod client; // register, file and login access over one link
pub mod extension; // private function 0x41 requests and responses
pub mod modbus; // PDUs and the Transport trait
pub mod tcp; // Modbus-TCP transport
