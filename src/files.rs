use crate::prelude::*;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use crate::error::Result;

pub static OPTIMIZER_ALARM_CODES: &[(u32, &str)] = &[
    (0x0000_0001, "Input Overvoltage"),
    (0x0000_0002, "Input Undervoltage"),
    (0x0000_0008, "Output Overvoltage"),
    (0x0000_0010, "Overtemperature"),
    (0x0000_0020, "Output Short Circuit"),
    (0x0000_0040, "EEPROM Fault"),
    (0x0000_0080, "Internal Hardware Fault"),
    (0x0000_0100, "Abnormal Voltage To Ground"),
    (0x0000_0200, "Power-off due to heartbeat timeout"),
    (0x0000_0400, "Fast shutdown"),
    (0x0000_0800, "Request Escape Alarm"),
    (0x0000_1000, "Version mismatch alarm"),
    (0x0000_8000, "Input overvoltage"),
    (0x0001_0000, "Overtemperature"),
    (0x0002_0000, "Output short circuit"),
    (0x0004_0000, "Internal hardware fault"),
    (0x0008_0000, "Version mismatch alarm"),
    (0x0010_0000, "Backfeed alarm"),
    (0x0020_0000, "Abnormal output voltage"),
    (0x0040_0000, "Upgrade failure"),
    (0x0400_0000, "Display bit 16 to bit 30 alarms"),
];

fn alarm_labels(alarm: u32) -> Vec<String> {
    OPTIMIZER_ALARM_CODES
        .iter()
        .filter(|(bit, _)| alarm & bit != 0)
        .map(|(_, label)| label.to_string())
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum OptimizerRunningStatus {
    Offline = 0,
    Standby = 1,
    Faulty = 3,
    Running = 4,
    PowerOff = 12,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum OptimizerOnlineStatus {
    Offline = 0,
    Online = 1,
    Disconnected = 2,
}

// {{{ OptimizerRealTimeDataFile
#[derive(Nom)]
#[nom(LittleEndian)]
struct RealTimeHeader {
    #[nom(Parse = "Utils::ascii(4)")]
    #[nom(SkipAfter(8))]
    version: String,
}

#[derive(Nom)]
#[nom(LittleEndian)]
struct RealTimeUnitHeader {
    time: i32,
    #[nom(SkipBefore(4))]
    _length: i16,
    count: i16,
}

#[derive(Nom)]
#[nom(LittleEndian)]
struct RealTimeRecord {
    address: i16,
    #[nom(Parse = "Utils::le_i16_div10")]
    output_power: f64,
    #[nom(Parse = "Utils::le_i16_div10")]
    voltage_to_ground: f64,
    alarm: u32,
    #[nom(Parse = "Utils::le_i16_div10")]
    output_voltage: f64,
    #[nom(Parse = "Utils::le_i16_div100")]
    output_current: f64,
    #[nom(Parse = "Utils::le_i16_div10")]
    input_voltage: f64,
    #[nom(Parse = "Utils::le_i16_div100")]
    input_current: f64,
    #[nom(Parse = "Utils::le_i16_div10")]
    temperature: f64,
    running_status: i16,
    #[nom(Parse = "Utils::le_u32_div1000")]
    accumulated_energy_yield: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizerRealTimeData {
    pub optimizer_address: u16,
    pub output_power: f64,      // W
    pub voltage_to_ground: f64, // V
    pub alarm: Vec<String>,
    pub output_voltage: f64, // V
    pub output_current: f64, // A
    pub input_voltage: f64,  // V
    pub input_current: f64,  // A
    pub temperature: f64,    // °C
    pub running_status: OptimizerRunningStatus,
    pub accumulated_energy_yield: f64, // kWh
}

impl TryFrom<RealTimeRecord> for OptimizerRealTimeData {
    type Error = Error;

    fn try_from(record: RealTimeRecord) -> Result<Self> {
        let running_status = u16::try_from(record.running_status)
            .ok()
            .and_then(|status| OptimizerRunningStatus::try_from(status).ok())
            .ok_or_else(|| {
                Error::Decode(format!(
                    "unknown optimizer running status {}",
                    record.running_status
                ))
            })?;

        Ok(Self {
            optimizer_address: record.address as u16,
            output_power: record.output_power,
            voltage_to_ground: record.voltage_to_ground,
            alarm: alarm_labels(record.alarm),
            output_voltage: record.output_voltage,
            output_current: record.output_current,
            input_voltage: record.input_voltage,
            input_current: record.input_current,
            temperature: record.temperature,
            running_status,
            accumulated_energy_yield: record.accumulated_energy_yield,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizerRealTimeDataUnit {
    pub time: DateTime<Utc>,
    pub optimizers: Vec<OptimizerRealTimeData>,
}

/// Optimizer telemetry history, retrieved as file type 0x44.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OptimizerRealTimeDataFile {
    pub file_version: Option<String>,
    pub data_units: Vec<OptimizerRealTimeDataUnit>,
}

impl OptimizerRealTimeDataFile {
    pub const FILE_TYPE: u8 = 0x44;

    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut file = Self::default();

        let Ok((mut rest, header)) = RealTimeHeader::parse(input) else {
            return Ok(file);
        };
        file.file_version = Some(header.version);

        while !rest.is_empty() {
            let Ok((after_unit, unit)) = RealTimeUnitHeader::parse(rest) else {
                warn!("optimizer data truncated after {} units", file.data_units.len());
                break;
            };
            rest = after_unit;

            let mut optimizers = Vec::with_capacity(unit.count.max(0) as usize);
            for _ in 0..unit.count {
                let Ok((after_record, record)) = RealTimeRecord::parse(rest) else {
                    warn!("optimizer data unit truncated after {} records", optimizers.len());
                    return Ok(file);
                };
                rest = after_record;
                optimizers.push(OptimizerRealTimeData::try_from(record)?);
            }

            let time = Utc
                .timestamp_opt(i64::from(unit.time), 0)
                .single()
                .ok_or_else(|| Error::Decode(format!("invalid optimizer data time {}", unit.time)))?;
            file.data_units.push(OptimizerRealTimeDataUnit { time, optimizers });
        }

        Ok(file)
    }

    /// Payload asking for the data recorded between two device timestamps.
    pub fn query_within_timespan(start_time: u32, end_time: u32) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(14);
        buf.put_u8(0x10); // tag
        buf.put_u8(12); // value length
        buf.put_u32(start_time);
        buf.put_u32(end_time);
        buf.put_u32(0); // reserved
        buf.to_vec()
    }
}
// }}}

// {{{ OptimizerSystemInformationDataFile
pub const INVALID_OPTIMIZER_POSITION: u16 = 0xFFFF;

#[derive(Nom)]
#[nom(BigEndian)]
struct SystemInformationHeader {
    #[nom(Parse = "Utils::ascii(4)")]
    version: String,
    _sequence_number: u16,
    _length: u16,
    _reserved: u8,
    #[nom(SkipBefore(3))]
    count: u16,
}

#[derive(Nom)]
#[nom(BigEndian)]
struct SystemInformationRecord {
    address: u16,
    online_status: u16,
    // the first byte duplicates the second one
    #[nom(SkipBefore(1))]
    string_number: i8,
    position: u16,
    #[nom(Parse = "Utils::ascii(20)")]
    sn: String,
    #[nom(Parse = "Utils::ascii(30)")]
    software_version: String,
    #[nom(Parse = "Utils::ascii(20)")]
    alias: String,
    #[nom(Parse = "Utils::ascii(30)")]
    model: String,
}

#[derive(Nom)]
#[nom(BigEndian)]
struct SystemInformationV103Extension {
    #[nom(SkipBefore(2))] // machine id
    one_to_more: u16,
    rated_power: u16,
    cpu_type: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptimizerSystemInformation {
    pub optimizer_address: u16,
    pub online_status: OptimizerOnlineStatus,
    pub string_number: i8,
    pub position_in_current_string: Option<u16>,
    pub sn: String,
    pub software_version: String,
    pub alias: String,
    pub model: String,
    // V103 only
    pub rated_power: Option<u16>,
    pub one_to_more: Option<bool>,
    pub cpu_type: Option<u16>,
}

impl TryFrom<SystemInformationRecord> for OptimizerSystemInformation {
    type Error = Error;

    fn try_from(record: SystemInformationRecord) -> Result<Self> {
        let online_status = OptimizerOnlineStatus::try_from(record.online_status)
            .map_err(|_| Error::Decode(format!("unknown optimizer online status {}", record.online_status)))?;

        Ok(Self {
            optimizer_address: record.address,
            online_status,
            string_number: record.string_number,
            position_in_current_string: (record.position != INVALID_OPTIMIZER_POSITION)
                .then_some(record.position),
            sn: record.sn,
            software_version: record.software_version,
            alias: record.alias,
            model: record.model,
            rated_power: None,
            one_to_more: None,
            cpu_type: None,
        })
    }
}

/// Optimizer inventory, retrieved as file type 0x45.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OptimizerSystemInformationDataFile {
    pub file_version: Option<String>,
    pub optimizers: Vec<OptimizerSystemInformation>,
}

impl OptimizerSystemInformationDataFile {
    pub const FILE_TYPE: u8 = 0x45;

    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut file = Self::default();

        let Ok((mut rest, header)) = SystemInformationHeader::parse(input) else {
            return Ok(file);
        };

        let v103 = match header.version.as_str() {
            "V102" => false,
            "V103" => true,
            other => {
                return Err(Error::Decode(format!(
                    "Unsupported OptimizerSystemInformation file version: {}",
                    other
                )))
            }
        };
        file.file_version = Some(header.version);

        for _ in 0..header.count {
            let Ok((after_record, record)) = SystemInformationRecord::parse(rest) else {
                warn!("optimizer system information truncated after {} records", file.optimizers.len());
                break;
            };
            rest = after_record;
            let mut optimizer = OptimizerSystemInformation::try_from(record)?;

            if v103 {
                let Ok((after_extension, extension)) = SystemInformationV103Extension::parse(rest) else {
                    warn!("optimizer system information truncated after {} records", file.optimizers.len());
                    break;
                };
                rest = after_extension;
                optimizer.one_to_more = Some(extension.one_to_more != 0);
                optimizer.rated_power = Some(extension.rated_power);
                optimizer.cpu_type = Some(extension.cpu_type);
            }

            file.optimizers.push(optimizer);
        }

        Ok(file)
    }
}
// }}}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_bits() {
        assert_eq!(alarm_labels(0x11), vec!["Input Overvoltage", "Overtemperature"]);
        assert!(alarm_labels(0).is_empty());
    }

    #[test]
    fn query_payload() {
        assert_eq!(
            OptimizerRealTimeDataFile::query_within_timespan(1, 2),
            vec![0x10, 12, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 0]
        );
    }

    #[test]
    fn short_buffers_have_no_records() {
        assert!(OptimizerRealTimeDataFile::parse(&[]).unwrap().data_units.is_empty());
        assert!(OptimizerRealTimeDataFile::parse(&[0; 11]).unwrap().data_units.is_empty());
        assert!(OptimizerSystemInformationDataFile::parse(&[0; 13]).unwrap().optimizers.is_empty());
    }
}
