/// Controller date-and-time (DTL) encoding
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::{Error, Result};
use crate::models::Timestamp;

pub const TIMESTAMP_BYTE_SIZE: usize = 12;

/// Encode a timestamp into its 12-byte big-endian form
///
/// Layout:
/// - Bytes 0-1: Year
/// - Bytes 2-7: Month, day, weekday, hour, minute, second (one byte each)
/// - Bytes 8-11: Nanoseconds of the second
pub fn encode(timestamp: &Timestamp) -> [u8; TIMESTAMP_BYTE_SIZE] {
    let mut out = [0u8; TIMESTAMP_BYTE_SIZE];
    out[0..2].copy_from_slice(&timestamp.year.to_be_bytes());
    out[2] = timestamp.month;
    out[3] = timestamp.day;
    out[4] = timestamp.weekday;
    out[5] = timestamp.hour;
    out[6] = timestamp.minute;
    out[7] = timestamp.second;
    out[8..12].copy_from_slice(&timestamp.nanosecond.to_be_bytes());
    out
}

pub fn decode(data: &[u8]) -> Result<Timestamp> {
    if data.len() != TIMESTAMP_BYTE_SIZE {
        return Err(Error::format(format!(
            "timestamp payload must be {TIMESTAMP_BYTE_SIZE} bytes, got {}",
            data.len()
        )));
    }

    Ok(Timestamp {
        year: u16::from_be_bytes([data[0], data[1]]),
        month: data[2],
        day: data[3],
        weekday: data[4],
        hour: data[5],
        minute: data[6],
        second: data[7],
        nanosecond: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
    })
}

/// Convert to a calendar date-time with microsecond resolution
///
/// Nanoseconds are truncated (integer division by 1000), never rounded.
/// The weekday byte is not consulted. Field combinations that do not name
/// a real instant are reported as validation errors.
pub fn to_calendar(timestamp: &Timestamp) -> Result<PrimitiveDateTime> {
    let invalid = |e: time::error::ComponentRange| {
        Error::validation(format!("timestamp {timestamp:?} is not a calendar time: {e}"))
    };

    let month = Month::try_from(timestamp.month).map_err(invalid)?;
    let date =
        Date::from_calendar_date(i32::from(timestamp.year), month, timestamp.day).map_err(invalid)?;
    let time = Time::from_hms_micro(
        timestamp.hour,
        timestamp.minute,
        timestamp.second,
        timestamp.nanosecond / 1000,
    )
    .map_err(invalid)?;

    Ok(PrimitiveDateTime::new(date, time))
}

/// Build a controller timestamp from a calendar date-time, deriving the weekday
pub fn from_calendar(dt: &PrimitiveDateTime) -> Result<Timestamp> {
    let year = u16::try_from(dt.year())
        .map_err(|_| Error::validation(format!("year {} does not fit the controller clock", dt.year())))?;

    Ok(Timestamp {
        year,
        month: u8::from(dt.month()),
        day: dt.day(),
        weekday: dt.weekday().number_from_monday(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        nanosecond: dt.nanosecond(),
    })
}
