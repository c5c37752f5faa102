use crate::prelude::*;

use {
    hmac::{Hmac, Mac},
    rand::RngCore,
    sha2::{Digest, Sha256},
    std::sync::{Arc, PoisonError},
    std::time::Duration,
    tokio::sync::Mutex,
    tokio::time::Instant,
};

use crate::error::Result;
use crate::huawei::extension::{self, *};
use crate::huawei::modbus::{self, Request, Response, Transport};
use crate::huawei::tcp::TcpTransport;
use crate::register::{table, values::StorageProductModel, DeviceContext, RegisterDefinition};

pub const DEFAULT_TCP_PORT: u16 = 502;
pub const DEFAULT_SLAVE_ID: u8 = 0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10; // the SDongle can be slow to answer
pub const DEFAULT_COOLDOWN_MS: u64 = 50;
pub const DEFAULT_WAIT_AFTER_CONNECT_MS: u64 = 1500;

pub const HEARTBEAT_REGISTER: u16 = 49999;

// distance between the first and the last register of one read
pub const MAX_REGISTER_GAP: u16 = 64;

const READ_RETRY_DELAY_MS: u64 = 500; // back-off before the single read retry
const LOGIN_DELAY_MS: u64 = 50; // between challenge and login

const MAX_UPLOAD_FRAMES: u64 = u16::MAX as u64 + 1;
const MAX_UPLOAD_PREALLOCATION: usize = 64 * 1024;

#[derive(Clone, Copy, Debug)]
enum Operation {
    Read,
    Write,
}

fn exception_error(operation: Operation, code: u8, message: String) -> Error {
    match code {
        modbus::PERMISSION_DENIED => Error::PermissionDenied,
        modbus::SLAVE_BUSY => Error::SlaveBusy,
        modbus::SLAVE_FAILURE => Error::SlaveFailure,
        _ => {
            let message = format!("{}: {}", message, modbus::exception_name(code));
            match operation {
                Operation::Read => Error::Read {
                    message,
                    exception_code: Some(code),
                },
                Operation::Write => Error::Write {
                    message,
                    exception_code: Some(code),
                },
            }
        }
    }
}

fn compute_digest(password: &[u8], seed: &[u8]) -> Result<Vec<u8>> {
    let key = Sha256::digest(password);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).map_err(|err| Error::InvalidRequest(format!("hmac key: {}", err)))?;
    mac.update(seed);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Register and file access to one Huawei device link.
///
/// Every exchange holds the communication guard, so requests never overlap
/// on the wire, and is spaced from the previous one by the cooldown.
pub struct HuaweiSolar {
    transport: Arc<dyn Transport>,
    slave_id: u8,
    cooldown: Duration,
    // when the previous exchange finished
    communication: Mutex<Option<Instant>>,
    context: std::sync::Mutex<DeviceContext>,
}

impl HuaweiSolar {
    pub fn new(transport: Arc<dyn Transport>, slave_id: u8, cooldown: Duration) -> Self {
        Self {
            transport,
            slave_id,
            cooldown,
            communication: Mutex::new(None),
            context: std::sync::Mutex::new(DeviceContext::default()),
        }
    }

    /// Wraps `transport` and reads the device state the codecs depend on.
    /// The transport is closed again when that fails.
    pub async fn create(transport: Arc<dyn Transport>, slave_id: u8, cooldown: Duration) -> Result<Self> {
        let client = Self::new(transport, slave_id, cooldown);

        if let Err(err) = client.initialize().await {
            error!("aborting client creation: {}", err);
            client.transport.close().await;
            return Err(Error::Connection(format!("could not initialize client: {}", err)));
        }

        Ok(client)
    }

    pub async fn connect(
        host: &str,
        port: u16,
        slave_id: u8,
        timeout: Duration,
        cooldown: Duration,
        wait_after_connect: Duration,
    ) -> Result<Self> {
        let transport = TcpTransport::connect(host, port, timeout, wait_after_connect).await?;
        Self::create(Arc::new(transport), slave_id, cooldown).await
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn context(&self) -> DeviceContext {
        *self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_context(&self, f: impl FnOnce(&mut DeviceContext)) {
        f(&mut self.context.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub async fn initialize(&self) -> Result<()> {
        let time_zone = self.get(rn::TIME_ZONE, None).await?;
        let time_zone = time_zone.value.as_code().map(|tz| tz as i16);
        self.update_context(|ctx| ctx.time_zone = time_zone);

        self.determine_battery_type(None).await
    }

    /// Looks for a battery on unit 1, then on unit 2. A device without
    /// battery support answers with a read error.
    pub async fn determine_battery_type(&self, slave: Option<u8>) -> Result<()> {
        if matches!(self.context().battery_type, Some(model) if model != StorageProductModel::None) {
            return Ok(());
        }

        let mut battery_type = None;
        for name in [rn::STORAGE_UNIT_1_PRODUCT_MODEL, rn::STORAGE_UNIT_2_PRODUCT_MODEL] {
            match self.get(name, slave).await {
                Ok(reading) => {
                    battery_type = StorageProductModel::from_value(&reading.value);
                    if battery_type != Some(StorageProductModel::None) {
                        break;
                    }
                }
                Err(err @ Error::Read { .. }) => {
                    info!("no battery support detected ({}), assuming none", err);
                    battery_type = None;
                    break;
                }
                Err(err) => {
                    error!("could not determine battery type: {}", err);
                    return Err(err);
                }
            }
        }

        debug!("battery type: {:?}", battery_type);
        self.update_context(|ctx| ctx.battery_type = battery_type);
        Ok(())
    }

    pub async fn stop(&self) {
        self.transport.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // caller holds the communication guard, `last` is its content
    async fn exchange(&self, last: &mut Option<Instant>, slave: u8, request: &Request) -> Result<Response> {
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.cooldown).await;
        }

        trace!("slave {}: TX {:?}", slave, request);
        let result = self.transport.call(slave, &request.bytes()).await;
        *last = Some(Instant::now());

        let response = Response::decode(&result?)?;
        trace!("slave {}: RX {:?}", slave, response);
        Ok(response)
    }

    async fn private(
        &self,
        last: &mut Option<Instant>,
        slave: u8,
        request: PrivateRequest,
        what: &str,
    ) -> Result<Vec<u8>> {
        let expected: u8 = request.sub_function().into();

        match self.exchange(last, slave, &request.request()).await? {
            Response::Private { sub_function, content } if sub_function == expected => Ok(content),
            Response::Exception { code, .. } => Err(exception_error(Operation::Read, code, format!("{} failed", what))),
            other => Err(Error::read(format!("unexpected response to {}: {:?}", what, other))),
        }
    }

    // {{{ registers
    pub async fn get(&self, name: &str, slave: Option<u8>) -> Result<Reading> {
        let mut readings = self.get_multiple(&[name], slave).await?;
        readings
            .pop()
            .ok_or_else(|| Error::read(format!("no value returned for {}", name)))
    }

    /// Reads several registers with a single request. They must be given in
    /// ascending, non-overlapping order.
    pub async fn get_multiple(&self, names: &[&str], slave: Option<u8>) -> Result<Vec<Reading>> {
        if names.is_empty() {
            return Err(Error::InvalidRequest("Expected at least one register name".to_string()));
        }

        let registers = names
            .iter()
            .map(|name| table::get(name).ok_or_else(|| Error::UnknownRegister(name.to_string())))
            .collect::<Result<Vec<&RegisterDefinition>>>()?;

        for (name, register) in names.iter().zip(&registers) {
            if !register.readable {
                return Err(Error::InvalidRequest(format!(
                    "Trying to read unreadable register {}",
                    name
                )));
            }
        }

        for pair in registers.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if prev.end() > cur.address {
                return Err(Error::InvalidRequest(format!(
                    "Requested registers must be in monotonically increasing order, but {} + {} > {}",
                    prev.address, prev.length, cur.address
                )));
            }
            if cur.address - prev.end() > MAX_REGISTER_GAP {
                return Err(Error::InvalidRequest(
                    "Gap between requested registers is too large. Split it in two requests".to_string(),
                ));
            }
        }

        let (first, last) = (registers[0], registers[registers.len() - 1]);
        let words = self
            .read_registers(first.address, last.end() - first.address, slave)
            .await?;

        let ctx = self.context();
        registers
            .iter()
            .map(|register| {
                let offset = (register.address - first.address) as usize;
                let value = register.decode(&words[offset..offset + register.length as usize], &ctx)?;
                Ok(register.reading(value))
            })
            .collect()
    }

    async fn read_registers(&self, address: u16, count: u16, slave: Option<u8>) -> Result<Vec<u16>> {
        match self.read_registers_once(address, count, slave).await {
            Err(err) if err.is_transient() => {
                debug!(
                    "{} while reading {} (length {}), retrying once",
                    err, address, count
                );
                tokio::time::sleep(Duration::from_millis(READ_RETRY_DELAY_MS)).await;
                self.read_registers_once(address, count, slave).await
            }
            other => other,
        }
    }

    async fn read_registers_once(&self, address: u16, count: u16, slave: Option<u8>) -> Result<Vec<u16>> {
        let slave = slave.unwrap_or(self.slave_id);
        let mut last = self.communication.lock().await;
        debug!("Reading register {} with length {} from slave {}", address, count, slave);

        let request = Request::ReadHoldingRegisters { address, count };
        match self.exchange(&mut last, slave, &request).await? {
            Response::ReadHoldingRegisters(words) if words.len() == count as usize => Ok(words),
            Response::ReadHoldingRegisters(words) => {
                debug!(
                    "requested {} registers from {}, received {}",
                    count,
                    address,
                    words.len()
                );
                Err(Error::SlaveBusy)
            }
            Response::Exception { code, .. } => Err(exception_error(
                Operation::Read,
                code,
                format!("Got error while reading from register {} with length {}", address, count),
            )),
            other => Err(Error::read(format!("unexpected response to read of {}: {:?}", address, other))),
        }
    }

    pub async fn set(&self, name: &str, value: &Value, slave: Option<u8>) -> Result<bool> {
        let register = table::get(name).ok_or_else(|| Error::UnknownRegister(name.to_string()))?;
        if !register.writeable {
            return Err(Error::write(format!("Register {} is not writable", name)));
        }

        let words = register.encode(value, &self.context())?;
        if words.len() != register.length as usize {
            return Err(Error::write("Wrong number of registers to write"));
        }

        let written = self.write_registers(register.address, &words, slave).await?;

        // take what went on the wire, the caller may have passed a float
        if name == rn::TIME_ZONE && written {
            let time_zone = words.first().map(|word| *word as i16);
            self.update_context(|ctx| ctx.time_zone = time_zone);
        }

        Ok(written)
    }

    async fn write_registers(&self, address: u16, words: &[u16], slave: Option<u8>) -> Result<bool> {
        let slave = slave.unwrap_or(self.slave_id);
        let mut last = self.communication.lock().await;
        debug!("Writing to {}: {:?} on slave {}", address, words, slave);

        let request = match words {
            [value] => Request::WriteSingleRegister { address, value: *value },
            _ => Request::WriteMultipleRegisters {
                address,
                values: words.to_vec(),
            },
        };

        match self.exchange(&mut last, slave, &request).await? {
            Response::WriteSingleRegister {
                address: echoed,
                value,
            } => Ok(echoed == address && words == [value]),
            Response::WriteMultipleRegisters { address: echoed, count } => {
                Ok(echoed == address && count as usize == words.len())
            }
            Response::Exception { code, .. } => Err(exception_error(
                Operation::Write,
                code,
                format!("Failed to write value {:?} to register {}", words, address),
            )),
            other => Err(Error::write(format!("unexpected response to write of {}: {:?}", address, other))),
        }
    }

    /// Keeps a logged-in session alive. Any failure reads as `false`.
    pub async fn heartbeat(&self, slave: Option<u8>) -> bool {
        if !self.transport.is_connected() {
            return false;
        }

        let slave = slave.unwrap_or(self.slave_id);
        let mut last = self.communication.lock().await;
        let request = Request::WriteSingleRegister {
            address: HEARTBEAT_REGISTER,
            value: 1,
        };

        match self.exchange(&mut last, slave, &request).await {
            Ok(Response::Exception { code, .. }) => {
                warn!(
                    "Received an error after sending the heartbeat command: {}",
                    modbus::exception_name(code)
                );
                false
            }
            Ok(_) => {
                debug!("Heartbeat succeeded");
                true
            }
            Err(err) => {
                warn!("Exception during heartbeat: {}", err);
                false
            }
        }
    }
    // }}}

    // {{{ files
    /// Retrieves a file through the upload sub-protocol: start, frames,
    /// complete, then CRC verification.
    pub async fn get_file(&self, file_type: u8, customized_data: Option<&[u8]>, slave: Option<u8>) -> Result<Vec<u8>> {
        let slave = slave.unwrap_or(self.slave_id);
        let mut last = self.communication.lock().await;
        debug!("Reading file {:#x} from slave {}", file_type, slave);

        let start = StartUpload {
            file_type,
            customized_data: customized_data.map(<[u8]>::to_vec).unwrap_or_default(),
        };
        let content = self.private(&mut last, slave, start.into(), "start upload").await?;
        let start: StartUploadResponse = extension::parse_response(&content, "start upload")?;
        if start.file_type != file_type {
            return Err(Error::read(format!(
                "requested file {:#x}, device started upload of {:#x}",
                file_type, start.file_type
            )));
        }
        if start.frame_length == 0 && start.file_length > 0 {
            return Err(Error::read(format!("file {:#x} has a zero frame length", file_type)));
        }
        // frame numbers are u16
        if u64::from(start.file_length) > MAX_UPLOAD_FRAMES * u64::from(start.frame_length) {
            return Err(Error::read(format!(
                "file {:#x} of {} bytes does not fit in {} frames of {} bytes",
                file_type, start.file_length, MAX_UPLOAD_FRAMES, start.frame_length
            )));
        }

        let mut data = Vec::with_capacity((start.file_length as usize).min(MAX_UPLOAD_PREALLOCATION));
        let mut frame_no: u16 = 0;
        while u64::from(frame_no) * u64::from(start.frame_length) < u64::from(start.file_length) {
            let request = UploadFrame { file_type, frame_no };
            let content = self.private(&mut last, slave, request.into(), "upload frame").await?;
            let frame: UploadFrameResponse = extension::parse_response(&content, "upload frame")?;
            if frame.file_type != file_type || frame.frame_no != frame_no {
                return Err(Error::read(format!(
                    "expected frame {} of file {:#x}, got frame {} of file {:#x}",
                    frame_no, file_type, frame.frame_no, frame.file_type
                )));
            }
            data.extend_from_slice(&frame.data);
            frame_no = match frame_no.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        let content = self
            .private(&mut last, slave, CompleteUpload { file_type }.into(), "complete upload")
            .await?;
        let complete: CompleteUploadResponse = extension::parse_response(&content, "complete upload")?;
        if complete.file_type != file_type {
            return Err(Error::read(format!(
                "completed upload of {:#x} instead of {:#x}",
                complete.file_type, file_type
            )));
        }

        let computed = crc16::State::<crc16::MODBUS>::calculate(&data);
        if computed != complete.crc {
            return Err(Error::read(format!(
                "Computed CRC {:x} for file {:#x} does not match expected value {:x}",
                computed, file_type, complete.crc
            )));
        }

        Ok(data)
    }
    // }}}

    // {{{ login
    /// Runs the challenge/response login. `Ok(false)` means the device
    /// rejected the credentials.
    pub async fn login(&self, username: &str, password: &str, slave: Option<u8>) -> Result<bool> {
        let slave = slave.unwrap_or(self.slave_id);
        let mut last = self.communication.lock().await;
        debug!("Logging in on slave {}", slave);

        let content = self
            .private(&mut last, slave, LoginChallenge.into(), "login challenge")
            .await?;
        let inverter_challenge = extension::inverter_challenge(&content)?;

        let mut client_challenge = [0u8; CHALLENGE_LEN];
        rand::thread_rng().fill_bytes(&mut client_challenge);

        let login = Login {
            client_challenge,
            username: username.to_string(),
            mac: compute_digest(password.as_bytes(), &inverter_challenge)?,
        };

        tokio::time::sleep(Duration::from_millis(LOGIN_DELAY_MS)).await;
        let content = self.private(&mut last, slave, login.into(), "login").await?;
        let response = LoginResponse::parse(&content)?;

        if !response.accepted {
            return Ok(false);
        }

        if compute_digest(password.as_bytes(), &client_challenge)? != response.inverter_mac {
            error!("Inverter response contains an invalid challenge answer. This could indicate a MitM-attack!");
        }

        Ok(true)
    }
    // }}}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_mapping() {
        assert!(matches!(
            exception_error(Operation::Read, 0x80, String::new()),
            Error::PermissionDenied
        ));
        assert!(matches!(exception_error(Operation::Write, 6, String::new()), Error::SlaveBusy));
        assert!(matches!(
            exception_error(Operation::Write, 2, String::new()),
            Error::Write {
                exception_code: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn digest_is_keyed_by_password_hash() {
        let a = compute_digest(b"00000a", &[1; 16]).unwrap();
        let b = compute_digest(b"00000b", &[1; 16]).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
