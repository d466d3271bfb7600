//! Packed binary fields shared by directory headers and entries.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

use super::error::DecodeError;

pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&buf[offset..offset + 2])
}

/// 3-byte little-endian field (EOF).
pub fn read_u24(buf: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u24(&buf[offset..offset + 3])
}

/// Decode the first `length` bytes of a name field, high bit stripped.
pub fn decode_name(bytes: &[u8], length: usize) -> String {
    bytes[..length.min(bytes.len())]
        .iter()
        .map(|&b| (b & 0x7F) as char)
        .collect()
}

/// Apply GS/OS lowercase flags (version/min_version word) to a name.
///
/// Bit 15 marks the word as valid; bit 14 covers the first character, bit 13
/// the second, and so on.
pub fn apply_case_flags(name: &str, flags: u16) -> String {
    if flags & 0x8000 == 0 {
        return name.to_string();
    }
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            if i < 15 && flags & (0x4000 >> i) != 0 {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Decode a packed date/time pair.
///
/// Date (LE u16): bits[15:9]=year, bits[8:5]=month, bits[4:0]=day.
/// Time (LE u16): bits[12:8]=hour, bits[5:0]=minute.
/// Year values below 70 are taken as 20xx. A zero date means no timestamp.
pub fn decode_timestamp(date: u16, time: u16) -> Result<Option<NaiveDateTime>, DecodeError> {
    if date == 0 {
        return Ok(None);
    }

    let year_raw = (date >> 9) & 0x7F;
    let month = (date >> 5) & 0xF;
    let day = date & 0x1F;
    let hour = (time >> 8) & 0x1F;
    let minute = time & 0x3F;

    let year = if year_raw < 70 {
        2000 + year_raw as i32
    } else {
        1900 + year_raw as i32
    };

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, 0))
        .map(Some)
        .ok_or(DecodeError::InvalidTimestamp { date, time })
}

/// Timestamp stored as date (2 bytes) then time (2 bytes) at `offset`.
pub fn read_timestamp(buf: &[u8], offset: usize) -> Result<Option<NaiveDateTime>, DecodeError> {
    decode_timestamp(read_u16(buf, offset), read_u16(buf, offset + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let buf = [0x34, 0x12, 0x0A, 0x00, 0x01];
        assert_eq!(read_u16(&buf, 0), 0x1234);
        assert_eq!(read_u24(&buf, 2), 0x01_000A);
    }

    #[test]
    fn test_decode_name_strips_high_bit_and_padding() {
        let mut raw = [0u8; 15];
        raw[..5].copy_from_slice(&[b'H' | 0x80, b'E', b'L' | 0x80, b'L', b'O']);
        raw[5] = b'X'; // padding past the length is ignored
        assert_eq!(decode_name(&raw, 5), "HELLO");
        assert_eq!(decode_name(&raw, 0), "");
    }

    #[test]
    fn test_case_flags() {
        assert_eq!(apply_case_flags("READ.ME", 0x0000), "READ.ME");
        // valid flag, first and fourth characters lowercase
        assert_eq!(apply_case_flags("READ.ME", 0x8000 | 0x4000 | 0x0800), "reAd.ME");
        // bits without the valid flag are ignored
        assert_eq!(apply_case_flags("READ.ME", 0x4000), "READ.ME");
    }

    #[test]
    fn test_decode_timestamp() {
        // 1991-10-15 14:30
        let date = (91u16 << 9) | (10 << 5) | 15;
        let time = (14u16 << 8) | 30;
        let ts = decode_timestamp(date, time).unwrap().unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "1991-10-15 14:30");

        // year 3 → 2003
        let date = (3u16 << 9) | (10 << 5) | 15;
        let ts = decode_timestamp(date, time).unwrap().unwrap();
        assert_eq!(ts.format("%Y").to_string(), "2003");
    }

    #[test]
    fn test_zero_timestamp_is_absent() {
        assert_eq!(decode_timestamp(0, 0), Ok(None));
        assert_eq!(decode_timestamp(0, 0x0E1E), Ok(None));
    }

    #[test]
    fn test_invalid_timestamp() {
        let bad_month = (91u16 << 9) | (13 << 5) | 1;
        assert_eq!(
            decode_timestamp(bad_month, 0),
            Err(DecodeError::InvalidTimestamp {
                date: bad_month,
                time: 0
            })
        );

        let feb_30 = (91u16 << 9) | (2 << 5) | 30;
        assert!(decode_timestamp(feb_30, 0).is_err());

        let ok_date = (91u16 << 9) | (2 << 5) | 3;
        let bad_hour = 24u16 << 8;
        assert!(decode_timestamp(ok_date, bad_hour).is_err());
        let bad_minute = 60u16;
        assert!(decode_timestamp(ok_date, bad_minute).is_err());
    }
}
