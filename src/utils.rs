use crate::prelude::*;

use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::{le_i16, le_u32};
use nom::IResult;

pub struct Utils;

impl Utils {
    pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    // odd trailing byte is padded with a zero
    pub fn bytes_to_words(bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
            .collect()
    }

    /// Expands a day-of-week bitmask (bit 0 = Sunday) into one flag per day.
    pub fn days_from_mask(mask: u8) -> [bool; 7] {
        let mut days = [false; 7];
        for (idx, day) in days.iter_mut().enumerate() {
            *day = mask & (1 << idx) != 0;
        }
        days
    }

    pub fn mask_from_days(days: &[bool; 7]) -> u8 {
        days.iter()
            .enumerate()
            .filter(|(_, enabled)| **enabled)
            .fold(0, |mask, (idx, _)| mask | (1 << idx))
    }

    /// NUL-padded text as found in registers and files. Undecodable bytes give an
    /// empty string so one bad field doesn't sink the whole batch.
    pub fn trimmed_string(raw: &[u8]) -> String {
        match std::str::from_utf8(raw) {
            Ok(s) => s.trim_end_matches('\0').to_string(),
            Err(err) => {
                warn!("could not decode {:02x?} ({}), ignoring", raw, err);
                String::new()
            }
        }
    }

    pub fn ascii(len: usize) -> impl Fn(&[u8]) -> IResult<&[u8], String> {
        move |input| map(take(len), Self::trimmed_string)(input)
    }

    pub fn le_i16_div10(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_i16, |v| f64::from(v) / 10.0)(input)
    }

    pub fn le_i16_div100(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_i16, |v| f64::from(v) / 100.0)(input)
    }

    pub fn le_u32_div1000(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_u32, |v| f64::from(v) / 1000.0)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_mask_bit_zero_is_sunday() {
        let days = Utils::days_from_mask(0b0100_0001);
        assert_eq!(days, [true, false, false, false, false, false, true]);
        assert_eq!(Utils::mask_from_days(&days), 0b0100_0001);
    }

    #[test]
    fn words_are_big_endian() {
        assert_eq!(Utils::words_to_bytes(&[0x1234, 0xabcd]), vec![0x12, 0x34, 0xab, 0xcd]);
        assert_eq!(Utils::bytes_to_words(&[0x12, 0x34, 0xab]), vec![0x1234, 0xab00]);
    }

    #[test]
    fn trailing_nul_padding_is_dropped() {
        assert_eq!(Utils::trimmed_string(b"SUN2000\0\0\0"), "SUN2000");
        assert_eq!(Utils::trimmed_string(&[0xe2, 0x28, 0xa1]), "");
    }
}
