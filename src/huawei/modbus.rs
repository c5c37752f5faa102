use crate::prelude::*;

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Result;

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = 0x03,
    WriteSingleRegister = 0x06,
    WriteMultipleRegisters = 0x10,
    HuaweiPrivate = 0x41,
}

// exception codes used by the device
pub const ILLEGAL_ADDRESS: u8 = 0x02;
pub const SLAVE_FAILURE: u8 = 0x04;
pub const SLAVE_BUSY: u8 = 0x06;
pub const PERMISSION_DENIED: u8 = 0x80;

pub fn exception_name(code: u8) -> &'static str {
    match code {
        0x01 => "IllegalFunction",
        ILLEGAL_ADDRESS => "IllegalAddress",
        0x03 => "IllegalValue",
        SLAVE_FAILURE => "SlaveFailure",
        0x05 => "Acknowledge",
        SLAVE_BUSY => "SlaveBusy",
        0x08 => "MemoryParityError",
        0x0A => "GatewayPathUnavailable",
        0x0B => "GatewayNoResponse",
        PERMISSION_DENIED => "PermissionDenied",
        _ => "Unknown",
    }
}

/// A link able to carry Modbus PDUs to a unit.
///
/// `call` sends one request PDU (function code first) and returns the
/// matching response PDU, exception responses included.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, slave: u8, pdu: &[u8]) -> Result<Vec<u8>>;
    async fn close(&self);
    fn is_connected(&self) -> bool;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    ReadHoldingRegisters { address: u16, count: u16 },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
    Private { sub_function: u8, content: Vec<u8> },
}

impl Request {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
            Self::Private { .. } => FunctionCode::HuaweiPrivate,
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.function_code().into());

        match self {
            Self::ReadHoldingRegisters { address, count } => {
                buf.put_u16(*address);
                buf.put_u16(*count);
            }
            Self::WriteSingleRegister { address, value } => {
                buf.put_u16(*address);
                buf.put_u16(*value);
            }
            Self::WriteMultipleRegisters { address, values } => {
                buf.put_u16(*address);
                buf.put_u16(values.len() as u16);
                buf.put_u8((values.len() * 2) as u8);
                for value in values {
                    buf.put_u16(*value);
                }
            }
            Self::Private { sub_function, content } => {
                buf.put_u8(*sub_function);
                buf.put_slice(content);
            }
        }

        buf.to_vec()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    ReadHoldingRegisters(Vec<u16>),
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleRegisters { address: u16, count: u16 },
    Private { sub_function: u8, content: Vec<u8> },
    Exception { function: u8, code: u8 },
}

impl Response {
    pub fn decode(pdu: &[u8]) -> Result<Self> {
        let mut buf = pdu;
        if buf.is_empty() {
            return Err(Error::read("empty response"));
        }
        let function = buf.get_u8();

        if function & 0x80 != 0 {
            if buf.is_empty() {
                return Err(Error::read(format!("truncated exception response {:02x?}", pdu)));
            }
            return Ok(Self::Exception {
                function: function & 0x7f,
                code: buf.get_u8(),
            });
        }

        let truncated = || Error::read(format!("truncated response {:02x?}", pdu));

        match FunctionCode::try_from(function) {
            Ok(FunctionCode::ReadHoldingRegisters) => {
                if buf.is_empty() {
                    return Err(truncated());
                }
                let byte_count = buf.get_u8() as usize;
                if buf.remaining() < byte_count || byte_count % 2 != 0 {
                    return Err(truncated());
                }
                Ok(Self::ReadHoldingRegisters(Utils::bytes_to_words(&buf[..byte_count])))
            }
            Ok(FunctionCode::WriteSingleRegister) => {
                if buf.remaining() < 4 {
                    return Err(truncated());
                }
                Ok(Self::WriteSingleRegister {
                    address: buf.get_u16(),
                    value: buf.get_u16(),
                })
            }
            Ok(FunctionCode::WriteMultipleRegisters) => {
                if buf.remaining() < 4 {
                    return Err(truncated());
                }
                Ok(Self::WriteMultipleRegisters {
                    address: buf.get_u16(),
                    count: buf.get_u16(),
                })
            }
            Ok(FunctionCode::HuaweiPrivate) => {
                if buf.is_empty() {
                    return Err(truncated());
                }
                let sub_function = buf.get_u8();
                Ok(Self::Private {
                    sub_function,
                    content: buf.to_vec(),
                })
            }
            Err(_) => Err(Error::read(format!("unexpected function code {:#04x}", function))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_multiple_layout() {
        let request = Request::WriteMultipleRegisters {
            address: 47255,
            values: vec![1, 2],
        };
        assert_eq!(request.bytes(), vec![0x10, 0xb8, 0x97, 0, 2, 4, 0, 1, 0, 2]);
    }

    #[test]
    fn exception_response() {
        assert_eq!(
            Response::decode(&[0x83, 0x80]).unwrap(),
            Response::Exception {
                function: 0x03,
                code: PERMISSION_DENIED
            }
        );
        assert_eq!(exception_name(SLAVE_BUSY), "SlaveBusy");
    }

    #[test]
    fn read_response() {
        assert_eq!(
            Response::decode(&[0x03, 4, 0x12, 0x34, 0, 1]).unwrap(),
            Response::ReadHoldingRegisters(vec![0x1234, 1])
        );
        assert!(Response::decode(&[0x03, 4, 0x12]).is_err());
    }
}
