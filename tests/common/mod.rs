#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use huawei_solar_bridge::error::Result;
use huawei_solar_bridge::huawei::modbus::Transport;
use huawei_solar_bridge::prelude::*;
use huawei_solar_bridge::register::{table, DeviceContext};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const USERNAME: &str = "installer";
pub const PASSWORD: &str = "00000a";
pub const HEARTBEAT_ADDRESS: u16 = 49999;

fn digest(password: &str, seed: &[u8]) -> Vec<u8> {
    let key = Sha256::digest(password.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(seed);
    mac.finalize().into_bytes().to_vec()
}

fn exception(function: u8, code: u8) -> Vec<u8> {
    vec![function | 0x80, code]
}

/// Register map and behaviour knobs of a simulated inverter.
pub struct Device {
    pub registers: HashMap<u16, u16>,
    // any read touching one of these addresses fails with the code
    pub read_exceptions: HashMap<u16, u8>,
    // served to the next reads, one per read
    pub queued_read_exceptions: VecDeque<u8>,
    pub queued_write_exceptions: VecDeque<u8>,
    // writes and file uploads are denied until a login succeeded
    pub require_login: bool,
    pub logged_in: bool,
    pub password: String,
    pub files: HashMap<u8, Vec<u8>>,
    pub frame_length: u8,
    // file length reported by start upload instead of the real one
    pub file_length_override: Option<u32>,
    pub crc_override: Option<u16>,
    pub heartbeat_fails: bool,
    pub inverter_challenge: [u8; 16],
    // every request as (slave, pdu)
    pub requests: Vec<(u8, Vec<u8>)>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            registers: HashMap::new(),
            read_exceptions: HashMap::new(),
            queued_read_exceptions: VecDeque::new(),
            queued_write_exceptions: VecDeque::new(),
            require_login: false,
            logged_in: false,
            password: PASSWORD.to_string(),
            files: HashMap::new(),
            frame_length: 100,
            file_length_override: None,
            crc_override: None,
            heartbeat_fails: false,
            inverter_challenge: [0x5a; 16],
            requests: Vec::new(),
        }
    }
}

impl Device {
    pub fn set_words(&mut self, name: &str, words: &[u16]) {
        let register = table::get(name).unwrap();
        assert_eq!(words.len(), register.length as usize, "{}", name);
        for (offset, word) in words.iter().enumerate() {
            self.registers.insert(register.address + offset as u16, *word);
        }
    }

    pub fn set_value(&mut self, name: &str, value: Value, ctx: &DeviceContext) {
        let register = table::get(name).unwrap();
        let words = register.encode(&value, ctx).unwrap();
        self.set_words(name, &words);
    }

    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set_value(name, Value::Integer(value), &DeviceContext::default());
    }

    pub fn set_text(&mut self, name: &str, value: &str) {
        self.set_value(name, Value::Text(value.to_string()), &DeviceContext::default());
    }

    pub fn words(&self, name: &str) -> Vec<u16> {
        let register = table::get(name).unwrap();
        (register.address..register.end())
            .map(|address| self.registers.get(&address).copied().unwrap_or(0))
            .collect()
    }

    pub fn fail_reads(&mut self, name: &str, code: u8) {
        let register = table::get(name).unwrap();
        self.read_exceptions.insert(register.address, code);
    }

    /// Requests with the given function code, as (slave, pdu).
    pub fn requests_with(&self, function: u8) -> Vec<(u8, Vec<u8>)> {
        self.requests
            .iter()
            .filter(|(_, pdu)| pdu.first() == Some(&function))
            .cloned()
            .collect()
    }

    fn write_denied(&mut self, function: u8) -> Option<Vec<u8>> {
        if let Some(code) = self.queued_write_exceptions.pop_front() {
            return Some(exception(function, code));
        }
        if self.require_login && !self.logged_in {
            return Some(exception(function, 0x80));
        }
        None
    }

    fn handle(&mut self, slave: u8, pdu: &[u8]) -> Vec<u8> {
        self.requests.push((slave, pdu.to_vec()));
        let word = |idx: usize| u16::from_be_bytes([pdu[idx], pdu[idx + 1]]);

        match pdu[0] {
            0x03 => {
                let (address, count) = (word(1), word(3));
                if let Some(code) = self.queued_read_exceptions.pop_front() {
                    return exception(0x03, code);
                }
                if let Some(code) = (address..address + count).find_map(|a| self.read_exceptions.get(&a)) {
                    return exception(0x03, *code);
                }

                let mut response = vec![0x03, (count * 2) as u8];
                for a in address..address + count {
                    response.extend(self.registers.get(&a).copied().unwrap_or(0).to_be_bytes());
                }
                response
            }
            0x06 => {
                let (address, value) = (word(1), word(3));
                if address == HEARTBEAT_ADDRESS {
                    if self.heartbeat_fails {
                        return exception(0x06, 0x80);
                    }
                    return pdu.to_vec();
                }
                if let Some(denied) = self.write_denied(0x06) {
                    return denied;
                }
                self.registers.insert(address, value);
                pdu.to_vec()
            }
            0x10 => {
                let (address, count) = (word(1), word(3));
                if let Some(denied) = self.write_denied(0x10) {
                    return denied;
                }
                for i in 0..count {
                    self.registers.insert(address + i, word(6 + 2 * i as usize));
                }
                pdu[..5].to_vec()
            }
            0x41 => self.private(pdu[1], &pdu[2..]),
            other => exception(other, 0x01),
        }
    }

    fn private(&mut self, sub_function: u8, content: &[u8]) -> Vec<u8> {
        let mut response = BytesMut::new();
        response.put_u8(0x41);
        response.put_u8(sub_function);

        match sub_function {
            // start upload
            0x05 => {
                if self.require_login && !self.logged_in {
                    return exception(0x41, 0x80);
                }
                let file_type = content[1];
                let Some(file) = self.files.get(&file_type) else {
                    return exception(0x41, 0x02);
                };
                response.put_u8(6);
                response.put_u8(file_type);
                response.put_u32(self.file_length_override.unwrap_or(file.len() as u32));
                response.put_u8(self.frame_length);
            }
            // upload frame
            0x06 => {
                let file_type = content[1];
                let frame_no = u16::from_be_bytes([content[2], content[3]]);
                let file = self.files.get(&file_type).cloned().unwrap_or_default();
                let start = (frame_no as usize * self.frame_length as usize).min(file.len());
                let end = (start + self.frame_length as usize).min(file.len());
                response.put_u8((3 + end - start) as u8);
                response.put_u8(file_type);
                response.put_u16(frame_no);
                response.put_slice(&file[start..end]);
            }
            // complete upload
            0x0C => {
                let file_type = content[1];
                let file = self.files.get(&file_type).cloned().unwrap_or_default();
                let crc = self
                    .crc_override
                    .unwrap_or_else(|| crc16::State::<crc16::MODBUS>::calculate(&file));
                response.put_u8(3);
                response.put_u8(file_type);
                response.put_u16(crc);
            }
            // login challenge
            36 => {
                response.put_u8(0x11);
                response.put_slice(&self.inverter_challenge);
            }
            // login
            37 => {
                let client_challenge = &content[1..17];
                let username_len = content[17] as usize;
                let mac_start = 18 + username_len + 1;
                let mac = &content[mac_start..mac_start + content[mac_start - 1] as usize];

                if mac != digest(&self.password, &self.inverter_challenge).as_slice() {
                    response.put_u8(1);
                    response.put_u8(1);
                } else {
                    self.logged_in = true;
                    let answer = digest(&self.password, client_challenge);
                    response.put_u8((2 + answer.len()) as u8);
                    response.put_u8(0);
                    response.put_u8(answer.len() as u8);
                    response.put_slice(&answer);
                }
            }
            _ => return exception(0x41, 0x01),
        }

        response.to_vec()
    }
}

/// In-memory Transport serving a Device.
pub struct MockTransport {
    pub device: Mutex<Device>,
    connected: AtomicBool,
}

impl MockTransport {
    pub fn new(device: Device) -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(device),
            connected: AtomicBool::new(true),
        })
    }

    pub fn device(&self) -> std::sync::MutexGuard<'_, Device> {
        self.device.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, slave: u8, pdu: &[u8]) -> Result<Vec<u8>> {
        if !self.connected.load(Ordering::SeqCst) {
            self.connected.store(true, Ordering::SeqCst);
        }
        Ok(self.device().handle(slave, pdu))
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct Factory;

impl Factory {
    /// A two string SUN2000 without battery, meter or optimizers.
    pub fn device() -> Device {
        let mut device = Device::default();
        device.set_text(rn::MODEL_NAME, "SUN2000-6KTL-M1");
        device.set_text(rn::SERIAL_NUMBER, "HV2040123456");
        device.set_text(rn::PN, "01074748");
        device.set_int(rn::NB_PV_STRINGS, 2);
        device.set_int(rn::TIME_ZONE, 60);
        device
    }

    pub fn luna2000_device() -> Device {
        let mut device = Self::device();
        device.set_int(rn::STORAGE_UNIT_1_PRODUCT_MODEL, 2);
        device
    }

    pub fn metered_device() -> Device {
        let mut device = Self::device();
        device.set_int(rn::METER_STATUS, 1);
        device.set_int(rn::METER_TYPE, 1);
        device
    }

    pub async fn client(transport: &Arc<MockTransport>) -> HuaweiSolar {
        HuaweiSolar::create(transport.clone(), 0, Duration::ZERO).await.unwrap()
    }

    pub async fn bridge(transport: &Arc<MockTransport>) -> HuaweiSolarBridge {
        let client = Self::client(transport).await;
        HuaweiSolarBridge::create(Arc::new(client), 0).await.unwrap()
    }

    /// One optimizer record of a real-time data file.
    pub fn real_time_record(address: i16, output_power: i16, alarm: u32, running_status: i16) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i16_le(address);
        buf.put_i16_le(output_power);
        buf.put_i16_le(2301); // voltage to ground
        buf.put_u32_le(alarm);
        buf.put_i16_le(385); // output voltage
        buf.put_i16_le(812); // output current
        buf.put_i16_le(402); // input voltage
        buf.put_i16_le(790); // input current
        buf.put_i16_le(355); // temperature
        buf.put_i16_le(running_status);
        buf.put_u32_le(123_456); // accumulated yield
        buf.to_vec()
    }

    pub fn real_time_file(units: &[(i32, Vec<Vec<u8>>)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_slice(b"V101");
        buf.put_slice(&[0; 8]);
        for (time, records) in units {
            buf.put_i32_le(*time);
            buf.put_slice(&[0; 4]);
            buf.put_i16_le((records.len() * 26) as i16);
            buf.put_i16_le(records.len() as i16);
            for record in records {
                buf.put_slice(record);
            }
        }
        buf.to_vec()
    }

    fn padded(text: &str, len: usize) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(len, 0);
        bytes
    }

    /// One optimizer of a system information file.
    pub fn system_information_record(address: u16, string_number: i8, position: u16, sn: &str) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16(address);
        buf.put_u16(1); // online
        buf.put_i8(string_number);
        buf.put_i8(string_number);
        buf.put_u16(position);
        buf.put_slice(&Self::padded(sn, 20));
        buf.put_slice(&Self::padded("V100R001C00SPC115", 30));
        buf.put_slice(&Self::padded(&format!("1.{}", address), 20));
        buf.put_slice(&Self::padded("SUN2000-450W-P", 30));
        buf.to_vec()
    }

    pub fn system_information_file(version: &str, records: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_slice(version.as_bytes());
        buf.put_u16(1); // sequence number
        buf.put_u16(0); // length
        buf.put_u8(0);
        buf.put_slice(&[0; 3]);
        buf.put_u16(records.len() as u16);
        for record in records {
            buf.put_slice(record);
            if version == "V103" {
                buf.put_u16(0); // machine id
                buf.put_u16(1); // one to more
                buf.put_u16(450); // rated power
                buf.put_u16(3); // cpu type
            }
        }
        buf.to_vec()
    }
}
