/// Utility functions for formatting poll results in log output
use time::{format_description, PrimitiveDateTime};

use crate::codec::{timestamp, REGISTER_BYTE_SIZE};
use crate::models::{Record, Timestamp, REGISTER_CAPACITY};
use crate::session::PollData;

const MAX_PREVIEW_BYTES: usize = 32;
const MAX_PREVIEW_RECORDS: usize = 5;
const PREVIEW_PAIRS: usize = 5;

/// Format a date-time for human-readable logging
///
/// Produces `YYYY-MM-DD HH:MM:SS.ffffff`.
/// Falls back to the default string representation if formatting fails.
pub fn format_datetime(dt: &PrimitiveDateTime) -> String {
    match format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]",
    ) {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Format a controller timestamp, showing raw fields when it is not a real date
pub fn format_timestamp(ts: &Timestamp) -> String {
    match timestamp::to_calendar(ts) {
        Ok(dt) => format_datetime(&dt),
        Err(_) => format!(
            "invalid({:04}-{:02}-{:02} {:02}:{:02}:{:02} ns={})",
            ts.year, ts.month, ts.day, ts.hour, ts.minute, ts.second, ts.nanosecond
        ),
    }
}

/// Space-separated hex of the first 32 bytes, with `...` when truncated
pub fn hex_preview(payload: &[u8]) -> String {
    let shown = payload.len().min(MAX_PREVIEW_BYTES);
    let mut preview = payload[..shown]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if payload.len() > shown {
        preview.push_str(" ...");
    }
    preview
}

/// One line per record with its header fields, flag bits and first order/count pairs
pub fn summarise_records(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let flags: String = record
                .flags
                .iter()
                .map(|&f| if f { '1' } else { '0' })
                .collect();
            let pairs = record
                .orders()
                .iter()
                .zip(record.counts())
                .take(PREVIEW_PAIRS)
                .map(|(order, count)| format!("{},{}", order, count))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "[{:03}] id={} zone={} sensor={} length={} position={} drop_box={} flags={} buttons={} ... timestamp={}",
                index,
                record.id,
                record.zone_id,
                record.sensor_id,
                record.length,
                record.position,
                record.drop_box_number,
                flags,
                pairs,
                format_timestamp(&record.timestamp)
            )
        })
        .collect()
}

/// Multi-line description of one poll result
pub fn summarise_payload(data: &PollData, block_id: u16, start: u32) -> String {
    let size = data.raw.len();
    let mut lines = vec![format!("Read {} byte(s) from DB{} @ {}.", size, block_id, start)];

    if size == 0 {
        lines.push("Payload is empty.".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "Hex preview ({} byte(s)): {}",
        size.min(MAX_PREVIEW_BYTES),
        hex_preview(&data.raw)
    ));

    match data.records.as_deref() {
        Some(records) if !records.is_empty() => {
            lines.push(format!("Parsed {} SAWLOG record(s).", records.len()));
            let shown = records.len().min(MAX_PREVIEW_RECORDS);
            lines.extend(summarise_records(&records[..shown]));
            if records.len() > shown {
                lines.push("...".to_string());
            }
            if records.len() == REGISTER_CAPACITY {
                lines.push(format!(
                    "Interpreted as full SAWLOG register ({} entries, {} bytes).",
                    REGISTER_CAPACITY, REGISTER_BYTE_SIZE
                ));
            }
        }
        _ => lines.push("Payload length fits no SAWLOG layout; skipping structured parse.".to_string()),
    }

    lines.join("\n")
}
