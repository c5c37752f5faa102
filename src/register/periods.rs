use bytes::{BufMut, BytesMut};
use nom::multi::count;
use nom::number::complete::be_u16;
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::schedule;
use crate::utils::Utils;

pub const LG_RESU_TOU_PERIODS: usize = 10;
pub const HUAWEI_LUNA2000_TOU_PERIODS: usize = 14;
pub const CHARGE_DISCHARGE_PERIODS: usize = 10;
// wire slots; at most PEAK_SETTING_MAX_PERIODS of them may be written
pub const PEAK_SETTING_PERIODS: usize = 14;
pub const PEAK_SETTING_MAX_PERIODS: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u8)]
pub enum ChargeFlag {
    Charge = 0,
    Discharge = 1,
}

/// A time-of-use window. Minutes are counted from midnight.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimeOfUsePeriod {
    Luna2000 {
        start: i32,
        end: i32,
        charge_flag: ChargeFlag,
        // Sunday first
        days: [bool; 7],
    },
    LgResu {
        start: i32,
        end: i32,
        electricity_price: f64,
    },
}

impl TimeOfUsePeriod {
    pub fn start(&self) -> i32 {
        match self {
            Self::Luna2000 { start, .. } | Self::LgResu { start, .. } => *start,
        }
    }

    pub fn end(&self) -> i32 {
        match self {
            Self::Luna2000 { end, .. } | Self::LgResu { end, .. } => *end,
        }
    }

    pub fn is_luna2000(&self) -> bool {
        matches!(self, Self::Luna2000 { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChargeDischargePeriod {
    pub start: i32,
    pub end: i32,
    pub power: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeakSettingPeriod {
    pub start: i32,
    pub end: i32,
    pub power: i32,
    pub days: [bool; 7],
}

// {{{ wire slots
#[derive(Nom)]
#[nom(BigEndian)]
struct LunaSlot {
    start: u16,
    end: u16,
    charge_flag: u8,
    days: u8,
}

#[derive(Nom)]
#[nom(BigEndian)]
struct LgResuSlot {
    start: u16,
    end: u16,
    price: u32,
}

#[derive(Nom)]
#[nom(BigEndian)]
struct ChargeDischargeSlot {
    start: u16,
    end: u16,
    power: i32,
}

#[derive(Nom)]
#[nom(BigEndian)]
struct PeakSlot {
    start: u16,
    end: u16,
    power: i32,
    days: u8,
}
// }}}

fn decode_error<E: std::fmt::Debug>(what: &str) -> impl FnOnce(E) -> Error + '_ {
    move |err| Error::Decode(format!("could not parse {}: {:?}", what, err))
}

fn header<'a>(bytes: &'a [u8], max: usize, what: &str) -> Result<(usize, &'a [u8])> {
    let (rest, number) = be_u16::<_, nom::error::Error<&[u8]>>(bytes).map_err(decode_error(what))?;
    let number = number as usize;
    if number > max {
        return Err(Error::Decode(format!(
            "{} reports {} periods, at most {} are supported",
            what, number, max
        )));
    }
    Ok((number, rest))
}

fn check_count(len: usize, max: usize, what: &str) -> Result<()> {
    if len > max {
        return Err(Error::Encode(format!(
            "{} accepts at most {} periods, got {}",
            what, max, len
        )));
    }
    Ok(())
}

fn minutes(value: i32) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::Encode(format!("{} is not a valid minute offset", value)))
}

pub fn decode_luna2000(words: &[u16]) -> Result<Vec<TimeOfUsePeriod>> {
    let bytes = Utils::words_to_bytes(words);
    let (number, rest) = header(&bytes, HUAWEI_LUNA2000_TOU_PERIODS, "LUNA2000 time-of-use")?;
    let (_, slots) =
        count(LunaSlot::parse, HUAWEI_LUNA2000_TOU_PERIODS)(rest).map_err(decode_error("LUNA2000 time-of-use"))?;

    slots
        .into_iter()
        .take(number)
        .map(|slot| {
            let charge_flag = ChargeFlag::try_from(slot.charge_flag)
                .map_err(|_| Error::Decode(format!("invalid charge flag {}", slot.charge_flag)))?;
            Ok(TimeOfUsePeriod::Luna2000 {
                start: i32::from(slot.start),
                end: i32::from(slot.end),
                charge_flag,
                days: Utils::days_from_mask(slot.days),
            })
        })
        .collect()
}

pub fn decode_lg_resu(words: &[u16]) -> Result<Vec<TimeOfUsePeriod>> {
    let bytes = Utils::words_to_bytes(words);
    let (number, rest) = header(&bytes, LG_RESU_TOU_PERIODS, "LG RESU time-of-use")?;
    let (_, slots) =
        count(LgResuSlot::parse, LG_RESU_TOU_PERIODS)(rest).map_err(decode_error("LG RESU time-of-use"))?;

    Ok(slots
        .into_iter()
        .take(number)
        .map(|slot| TimeOfUsePeriod::LgResu {
            start: i32::from(slot.start),
            end: i32::from(slot.end),
            electricity_price: f64::from(slot.price) / 1000.0,
        })
        .collect())
}

/// Encodes time-of-use periods. The layout follows the period variant; an
/// empty list takes the layout that fits `length` words.
pub fn encode_time_of_use(periods: &[TimeOfUsePeriod], length: u16) -> Result<Vec<u16>> {
    schedule::validate_time_of_use(periods)?;

    let luna = match periods.first() {
        Some(period) => period.is_luna2000(),
        None => length as usize != 1 + LG_RESU_TOU_PERIODS * 4,
    };

    let mut buf = BytesMut::new();
    if luna {
        check_count(periods.len(), HUAWEI_LUNA2000_TOU_PERIODS, "LUNA2000 time-of-use")?;
        buf.put_u16(periods.len() as u16);
        for period in periods {
            if let TimeOfUsePeriod::Luna2000 {
                start,
                end,
                charge_flag,
                days,
            } = period
            {
                buf.put_u16(minutes(*start)?);
                buf.put_u16(minutes(*end)?);
                buf.put_u8((*charge_flag).into());
                buf.put_u8(Utils::mask_from_days(days));
            }
        }
        for _ in periods.len()..HUAWEI_LUNA2000_TOU_PERIODS {
            buf.put_bytes(0, 6);
        }
    } else {
        check_count(periods.len(), LG_RESU_TOU_PERIODS, "LG RESU time-of-use")?;
        buf.put_u16(periods.len() as u16);
        for period in periods {
            if let TimeOfUsePeriod::LgResu {
                start,
                end,
                electricity_price,
            } = period
            {
                let price = (electricity_price * 1000.0).round();
                if !(0.0..=f64::from(u32::MAX)).contains(&price) {
                    return Err(Error::Encode(format!("electricity price {} out of range", electricity_price)));
                }
                buf.put_u16(minutes(*start)?);
                buf.put_u16(minutes(*end)?);
                buf.put_u32(price as u32);
            }
        }
        for _ in periods.len()..LG_RESU_TOU_PERIODS {
            buf.put_bytes(0, 8);
        }
    }

    Ok(Utils::bytes_to_words(&buf))
}

pub fn decode_charge_discharge(words: &[u16]) -> Result<Vec<ChargeDischargePeriod>> {
    let bytes = Utils::words_to_bytes(words);
    let (number, rest) = header(&bytes, CHARGE_DISCHARGE_PERIODS, "charge/discharge periods")?;
    let (_, slots) = count(ChargeDischargeSlot::parse, CHARGE_DISCHARGE_PERIODS)(rest)
        .map_err(decode_error("charge/discharge periods"))?;

    Ok(slots
        .into_iter()
        .take(number)
        .map(|slot| ChargeDischargePeriod {
            start: i32::from(slot.start),
            end: i32::from(slot.end),
            power: slot.power,
        })
        .collect())
}

pub fn encode_charge_discharge(periods: &[ChargeDischargePeriod]) -> Result<Vec<u16>> {
    check_count(periods.len(), CHARGE_DISCHARGE_PERIODS, "charge/discharge periods")?;

    let mut buf = BytesMut::new();
    buf.put_u16(periods.len() as u16);
    for period in periods {
        buf.put_u16(minutes(period.start)?);
        buf.put_u16(minutes(period.end)?);
        buf.put_i32(period.power);
    }
    for _ in periods.len()..CHARGE_DISCHARGE_PERIODS {
        buf.put_bytes(0, 8);
    }

    Ok(Utils::bytes_to_words(&buf))
}

/// Unused slots (start == end, or no weekday set) are left out.
pub fn decode_peak_settings(words: &[u16]) -> Result<Vec<PeakSettingPeriod>> {
    let bytes = Utils::words_to_bytes(words);
    let (rest, number) =
        be_u16::<_, nom::error::Error<&[u8]>>(&bytes[..]).map_err(decode_error("peak settings"))?;
    let number = (number as usize).min(PEAK_SETTING_PERIODS);
    let (_, slots) = count(PeakSlot::parse, number)(rest).map_err(decode_error("peak settings"))?;

    Ok(slots
        .into_iter()
        .filter(|slot| slot.start != slot.end && slot.days != 0)
        .map(|slot| PeakSettingPeriod {
            start: i32::from(slot.start),
            end: i32::from(slot.end),
            power: slot.power,
            days: Utils::days_from_mask(slot.days),
        })
        .collect())
}

pub fn encode_peak_settings(periods: &[PeakSettingPeriod]) -> Result<Vec<u16>> {
    check_count(periods.len(), PEAK_SETTING_MAX_PERIODS, "peak settings")?;
    schedule::validate_peak_settings(periods)?;

    let mut buf = BytesMut::new();
    buf.put_u16(periods.len() as u16);
    for period in periods {
        buf.put_u16(minutes(period.start)?);
        buf.put_u16(minutes(period.end)?);
        buf.put_i32(period.power);
        buf.put_u8(Utils::mask_from_days(&period.days));
    }
    for _ in periods.len()..PEAK_SETTING_PERIODS {
        buf.put_bytes(0, 9);
    }

    Ok(Utils::bytes_to_words(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DAYS: [bool; 7] = [true; 7];

    #[test]
    fn luna2000_layout() {
        let periods = vec![TimeOfUsePeriod::Luna2000 {
            start: 0,
            end: 360,
            charge_flag: ChargeFlag::Discharge,
            days: [true, false, false, false, false, false, true],
        }];
        let words = encode_time_of_use(&periods, 43).unwrap();
        assert_eq!(words.len(), 43);
        assert_eq!(&words[..4], &[1, 0, 360, 0x0141]);
        assert!(words[4..].iter().all(|w| *w == 0));
        assert_eq!(decode_luna2000(&words).unwrap(), periods);
    }

    #[test]
    fn lg_resu_layout() {
        let periods = vec![TimeOfUsePeriod::LgResu {
            start: 60,
            end: 120,
            electricity_price: 0.25,
        }];
        let words = encode_time_of_use(&periods, 41).unwrap();
        assert_eq!(words.len(), 41);
        assert_eq!(&words[..5], &[1, 60, 120, 0, 250]);
        assert_eq!(decode_lg_resu(&words).unwrap(), periods);
    }

    #[test]
    fn empty_list_follows_register_length() {
        assert_eq!(encode_time_of_use(&[], 41).unwrap().len(), 41);
        assert_eq!(encode_time_of_use(&[], 43).unwrap().len(), 43);
    }

    #[test]
    fn too_many_luna2000_periods_on_the_wire() {
        let mut words = vec![0u16; 43];
        words[0] = 15;
        assert!(matches!(decode_luna2000(&words), Err(Error::Decode(_))));
    }

    #[test]
    fn peak_settings_layout() {
        let periods = vec![PeakSettingPeriod {
            start: 0,
            end: 1440,
            power: 2500,
            days: ALL_DAYS,
        }];
        let words = encode_peak_settings(&periods).unwrap();
        assert_eq!(words.len(), 64);
        assert_eq!(decode_peak_settings(&words).unwrap(), periods);
    }

    #[test]
    fn peak_settings_skip_unused_slots() {
        let mut words = vec![0u16; 64];
        words[0] = 2;
        // slot 1: 0..1440, 1000 W, every day
        words[1] = 0;
        words[2] = 1440;
        words[3] = 0;
        words[4] = 1000;
        words[5] = 0x7f00;
        assert_eq!(decode_peak_settings(&words).unwrap().len(), 1);
    }

    #[test]
    fn too_many_peak_settings() {
        let periods = vec![
            PeakSettingPeriod {
                start: 0,
                end: 1440,
                power: 0,
                days: ALL_DAYS,
            };
            11
        ];
        assert!(matches!(encode_peak_settings(&periods), Err(Error::Encode(_))));
    }

    #[test]
    fn charge_discharge_layout() {
        let periods = vec![ChargeDischargePeriod {
            start: 0,
            end: 300,
            power: -2000,
        }];
        let words = encode_charge_discharge(&periods).unwrap();
        assert_eq!(words.len(), 41);
        assert_eq!(&words[..5], &[1, 0, 300, 0xffff, 0xf830]);
        assert_eq!(decode_charge_discharge(&words).unwrap(), periods);
    }
}
