pub mod names;
pub mod periods;
pub mod table;
pub mod values;

use chrono::{DateTime, TimeZone, Utc};
use enum_dispatch::enum_dispatch;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::Utils;
use periods::{ChargeDischargePeriod, PeakSettingPeriod, TimeOfUsePeriod};
use values::{BitLabel, GridCode, StorageProductModel};

/// Device state the codecs depend on. Passed explicitly to every decode and
/// encode call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceContext {
    /// Offset from UTC in minutes, as reported by the inverter.
    pub time_zone: Option<i16>,
    pub battery_type: Option<StorageProductModel>,
}

impl DeviceContext {
    fn time_zone_secs(&self) -> i64 {
        60 * i64::from(self.time_zone.unwrap_or(0))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    // the register reported its "invalid" sentinel
    Empty,
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Labels(Vec<String>),
    Enum { code: i64, name: String },
    GridCode(GridCode),
    Timestamp(DateTime<Utc>),
    TimeOfUse(Vec<TimeOfUsePeriod>),
    ChargeDischarge(Vec<ChargeDischargePeriod>),
    PeakSettings(Vec<PeakSettingPeriod>),
}

impl Value {
    /// Raw numeric code for integers, enums and booleans.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Enum { code, .. } => Some(*code),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => self.as_code().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Enum { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A decoded register value and, for plain measurements, its unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub value: Value,
    pub unit: Option<&'static str>,
}

#[derive(Clone, Copy, Debug)]
pub enum Unit {
    None,
    Label(&'static str),
    Bool,
    Lookup(&'static [(u32, &'static str)]),
    Enum(fn(i64) -> Option<&'static str>),
    Bits(&'static [(u32, BitLabel)]),
    GridCode,
}

#[derive(Clone, Copy, Debug)]
pub struct RegisterDefinition {
    pub address: u16,
    pub length: u16,
    pub kind: RegisterType,
    pub gain: u32,
    pub unit: Unit,
    pub readable: bool,
    pub writeable: bool,
}

impl RegisterDefinition {
    pub const fn new(address: u16, length: u16, kind: RegisterType) -> Self {
        Self {
            address,
            length,
            kind,
            gain: 1,
            unit: Unit::None,
            readable: true,
            writeable: false,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_gain(mut self, gain: u32) -> Self {
        self.gain = gain;
        self
    }

    pub fn writeable(mut self) -> Self {
        self.writeable = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.writeable = true;
        self.readable = false;
        self
    }

    /// First address past this register.
    pub fn end(&self) -> u16 {
        self.address + self.length
    }

    pub fn decode(&self, words: &[u16], ctx: &DeviceContext) -> Result<Value> {
        if words.len() != self.length as usize {
            return Err(Error::Decode(format!(
                "expected {} words for register {}, got {}",
                self.length,
                self.address,
                words.len()
            )));
        }
        self.kind.decode(self, words, ctx)
    }

    pub fn encode(&self, value: &Value, ctx: &DeviceContext) -> Result<Vec<u16>> {
        let words = self.kind.encode(self, value, ctx)?;
        if words.len() != self.length as usize {
            return Err(Error::Encode(format!(
                "encoded {} words for register {}, expected {}",
                words.len(),
                self.address,
                self.length
            )));
        }
        Ok(words)
    }

    pub fn reading(&self, value: Value) -> Reading {
        let unit = match self.unit {
            Unit::Label(label) => Some(label),
            _ => None,
        };
        Reading { value, unit }
    }
}

#[enum_dispatch]
pub trait Codec {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], ctx: &DeviceContext) -> Result<Value>;
    fn encode(&self, def: &RegisterDefinition, value: &Value, ctx: &DeviceContext) -> Result<Vec<u16>>;
}

#[enum_dispatch(Codec)]
#[derive(Clone, Copy, Debug)]
pub enum RegisterType {
    U16(U16),
    U32(U32),
    I16(I16),
    I32(I32),
    I32Absolute(I32Absolute),
    Str(Str),
    Timestamp(Timestamp),
    TimeOfUse(TimeOfUse),
    ChargeDischarge(ChargeDischarge),
    PeakSettings(PeakSettings),
}

// {{{ numbers
#[derive(Clone, Copy, Debug, Default)]
pub struct U16 {
    pub ignore_invalid: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct U32;

#[derive(Clone, Copy, Debug, Default)]
pub struct I16;

#[derive(Clone, Copy, Debug, Default)]
pub struct I32;

#[derive(Clone, Copy, Debug, Default)]
pub struct I32Absolute;

fn u32_from(words: &[u16]) -> u32 {
    (u32::from(words[0]) << 16) | u32::from(words[1])
}

/// Applies unit and gain to a raw register integer.
fn decode_number(def: &RegisterDefinition, raw: i64) -> Result<Value> {
    match def.unit {
        Unit::Bits(table) => Ok(Value::Labels(
            table
                .iter()
                .filter_map(|(mask, bit)| bit.label(raw & i64::from(*mask) != 0))
                .map(str::to_string)
                .collect(),
        )),
        Unit::Lookup(table) => table
            .iter()
            .find(|(key, _)| i64::from(*key) == raw)
            .map(|(_, label)| Value::Text(label.to_string()))
            .ok_or_else(|| Error::Decode(format!("unknown value {} for register {}", raw, def.address))),
        Unit::Enum(lookup) => lookup(raw)
            .map(|name| Value::Enum {
                code: raw,
                name: name.to_string(),
            })
            .ok_or_else(|| Error::Decode(format!("unknown value {} for register {}", raw, def.address))),
        Unit::GridCode => values::grid_code(raw)
            .map(Value::GridCode)
            .ok_or_else(|| Error::Decode(format!("unknown grid code {}", raw))),
        Unit::Bool => Ok(Value::Bool(raw != 0)),
        Unit::None | Unit::Label(_) if def.gain != 1 => Ok(Value::Float(raw as f64 / f64::from(def.gain))),
        Unit::None | Unit::Label(_) => Ok(Value::Integer(raw)),
    }
}

/// Turns a caller value into a raw register integer within `range`.
fn encode_number(def: &RegisterDefinition, value: &Value, range: (i64, i64)) -> Result<i64> {
    let raw = match (def.unit, value) {
        (Unit::Bool, Value::Bool(b)) => i64::from(*b),
        (Unit::Enum(lookup), Value::Enum { code, .. }) | (Unit::Enum(lookup), Value::Integer(code)) => {
            if lookup(*code).is_none() {
                return Err(Error::Encode(format!("{} is not a valid value for register {}", code, def.address)));
            }
            *code
        }
        (Unit::Lookup(_) | Unit::Bits(_) | Unit::GridCode | Unit::Enum(_), _) => {
            return Err(Error::Encode(format!("register {} cannot be written with {:?}", def.address, value)));
        }
        (_, Value::Integer(v)) => v
            .checked_mul(i64::from(def.gain))
            .ok_or_else(|| Error::Encode(format!("{} overflows", v)))?,
        (_, Value::Float(v)) => {
            let scaled = (v * f64::from(def.gain)).round();
            if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
                return Err(Error::Encode(format!("{} cannot be represented", v)));
            }
            scaled as i64
        }
        (_, Value::Bool(b)) => i64::from(*b),
        _ => {
            return Err(Error::Encode(format!("register {} cannot be written with {:?}", def.address, value)));
        }
    };

    if raw < range.0 || raw > range.1 {
        return Err(Error::Encode(format!(
            "{} is out of range for register {} ({}..={})",
            raw, def.address, range.0, range.1
        )));
    }
    Ok(raw)
}

impl Codec for U16 {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        if words[0] == u16::MAX && !self.ignore_invalid {
            return Ok(Value::Empty);
        }
        decode_number(def, i64::from(words[0]))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        let raw = encode_number(def, value, (0, i64::from(u16::MAX)))?;
        Ok(vec![raw as u16])
    }
}

impl Codec for U32 {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        let raw = u32_from(words);
        if raw == u32::MAX {
            return Ok(Value::Empty);
        }
        decode_number(def, i64::from(raw))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        let raw = encode_number(def, value, (0, i64::from(u32::MAX)))? as u32;
        Ok(vec![(raw >> 16) as u16, raw as u16])
    }
}

impl Codec for I16 {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        let raw = words[0] as i16;
        if raw == i16::MAX {
            return Ok(Value::Empty);
        }
        decode_number(def, i64::from(raw))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        let raw = encode_number(def, value, (i64::from(i16::MIN), i64::from(i16::MAX)))?;
        Ok(vec![raw as i16 as u16])
    }
}

impl Codec for I32 {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        let raw = u32_from(words) as i32;
        if raw == i32::MAX {
            return Ok(Value::Empty);
        }
        decode_number(def, i64::from(raw))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        let raw = encode_number(def, value, (i64::from(i32::MIN), i64::from(i32::MAX)))? as i32 as u32;
        Ok(vec![(raw >> 16) as u16, raw as u16])
    }
}

impl Codec for I32Absolute {
    fn decode(&self, def: &RegisterDefinition, words: &[u16], ctx: &DeviceContext) -> Result<Value> {
        Ok(match I32.decode(def, words, ctx)? {
            Value::Integer(v) => Value::Integer(v.abs()),
            Value::Float(v) => Value::Float(v.abs()),
            other => other,
        })
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, ctx: &DeviceContext) -> Result<Vec<u16>> {
        I32.encode(def, value, ctx)
    }
}
// }}}

// {{{ text and time
#[derive(Clone, Copy, Debug, Default)]
pub struct Str;

impl Codec for Str {
    fn decode(&self, _def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        Ok(Value::Text(Utils::trimmed_string(&Utils::words_to_bytes(words))))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        let Value::Text(text) = value else {
            return Err(Error::Encode(format!("register {} expects text", def.address)));
        };
        let capacity = 2 * def.length as usize;
        if text.len() > capacity {
            return Err(Error::Encode(format!(
                "'{}' does not fit in {} bytes",
                text, capacity
            )));
        }
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(capacity, 0);
        Ok(Utils::bytes_to_words(&bytes))
    }
}

/// Seconds since the epoch in device local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timestamp;

impl Codec for Timestamp {
    fn decode(&self, _def: &RegisterDefinition, words: &[u16], ctx: &DeviceContext) -> Result<Value> {
        let raw = u32_from(words);
        if raw == u32::MAX {
            return Ok(Value::Empty);
        }
        let secs = i64::from(raw) - ctx.time_zone_secs();
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(Value::Timestamp)
            .ok_or_else(|| Error::Decode(format!("Received invalid timestamp {}", raw)))
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, ctx: &DeviceContext) -> Result<Vec<u16>> {
        let Value::Timestamp(ts) = value else {
            return Err(Error::Encode(format!("register {} expects a timestamp", def.address)));
        };
        let raw = u32::try_from(ts.timestamp() + ctx.time_zone_secs())
            .map_err(|_| Error::Encode(format!("{} cannot be represented", ts)))?;
        Ok(vec![(raw >> 16) as u16, raw as u16])
    }
}
// }}}

// {{{ schedules
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeOfUse;

impl Codec for TimeOfUse {
    fn decode(&self, _def: &RegisterDefinition, words: &[u16], ctx: &DeviceContext) -> Result<Value> {
        match ctx.battery_type {
            Some(StorageProductModel::LgResu) => periods::decode_lg_resu(words).map(Value::TimeOfUse),
            Some(StorageProductModel::HuaweiLuna2000) => periods::decode_luna2000(words).map(Value::TimeOfUse),
            other => Err(Error::Decode(format!(
                "Invalid model to decode TOU Registers for: {:?}",
                other
            ))),
        }
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        match value {
            Value::TimeOfUse(list) => periods::encode_time_of_use(list, def.length),
            _ => Err(Error::Encode(format!("register {} expects time-of-use periods", def.address))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChargeDischarge;

impl Codec for ChargeDischarge {
    fn decode(&self, _def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        periods::decode_charge_discharge(words).map(Value::ChargeDischarge)
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        match value {
            Value::ChargeDischarge(list) => periods::encode_charge_discharge(list),
            _ => Err(Error::Encode(format!("register {} expects charge/discharge periods", def.address))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PeakSettings;

impl Codec for PeakSettings {
    fn decode(&self, _def: &RegisterDefinition, words: &[u16], _ctx: &DeviceContext) -> Result<Value> {
        periods::decode_peak_settings(words).map(Value::PeakSettings)
    }

    fn encode(&self, def: &RegisterDefinition, value: &Value, _ctx: &DeviceContext) -> Result<Vec<u16>> {
        match value {
            Value::PeakSettings(list) => periods::encode_peak_settings(list),
            _ => Err(Error::Encode(format!("register {} expects peak settings", def.address))),
        }
    }
}
// }}}
