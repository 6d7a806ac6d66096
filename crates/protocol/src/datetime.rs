//! Device timestamp packing
//!
//! The terminal stores timestamps as a u32 counted from the year 2000 in a
//! calendar-shaped radix: every month is treated as 31 days and every year
//! as 12 such months, so the value is NOT a plain seconds count. Both
//! directions are implemented; encode is exercised by the mock device and
//! round-trip tests.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{ProtocolError, Result};

/// Decode a packed device timestamp.
///
/// Fails with [`ProtocolError::InvalidTimestamp`] when the packed fields do
/// not name a real calendar date (e.g. February 30th), which on real
/// hardware indicates log corruption.
pub fn decode_timestamp(raw: u32) -> Result<NaiveDateTime> {
    let mut t = raw;
    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = t + 2000;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or(ProtocolError::InvalidTimestamp(raw))
}

/// Encode a timestamp into the device packing.
///
/// Only the last two digits of the year survive, matching the device's own
/// storage range.
pub fn encode_timestamp(ts: &NaiveDateTime) -> u32 {
    let days =
        (ts.year() as u32 % 100) * 12 * 31 + (ts.month() - 1) * 31 + (ts.day() - 1);
    days * 24 * 60 * 60 + (ts.hour() * 60 + ts.minute()) * 60 + ts.second()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn epoch_decodes_to_year_2000() {
        assert_eq!(decode_timestamp(0).unwrap(), dt(2000, 1, 1, 0, 0, 0));
    }

    #[test]
    fn roundtrip_typical_punch() {
        let ts = dt(2024, 9, 17, 8, 42, 5);
        assert_eq!(decode_timestamp(encode_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn roundtrip_end_of_year() {
        let ts = dt(2031, 12, 31, 23, 59, 59);
        assert_eq!(decode_timestamp(encode_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn nonexistent_calendar_date_is_rejected() {
        // Packs to February 30th, 2000, which no calendar has.
        let raw = (1 * 31 + 29) * 24 * 60 * 60;
        assert!(matches!(
            decode_timestamp(raw),
            Err(ProtocolError::InvalidTimestamp(_))
        ));
    }
}
