/// One read against the controller, classified into raw bytes and records
use log::debug;

use crate::codec::{record, register, REGISTER_BYTE_SIZE};
use crate::config::ReadRequest;
use crate::error::{Error, Result};
use crate::models::Record;
use crate::transport::Transport;

/// Which read strategy produced a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPath {
    /// Exactly the register block, decoded as 255 records
    Register,
    /// Any other byte range, decoded best-effort
    Range,
}

/// Raw bytes from one poll, plus the records they decoded to (if any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollData {
    pub raw: Vec<u8>,
    pub records: Option<Vec<Record>>,
    pub path: ReadPath,
}

/// Read the requested range and decode it
///
/// - If the range matches the full register (offset 0, full size), the
///   register codec is used and exactly 255 records come back; a short
///   or malformed payload is an error.
/// - Otherwise the range is read as-is; a non-empty payload is decoded in
///   whichever record layout its length fits, and a payload that fits
///   neither is published with `records: None`.
pub async fn fetch_payload_and_records<T>(transport: &mut T, request: &ReadRequest) -> Result<PollData>
where
    T: Transport + ?Sized,
{
    if request.is_full_register() {
        let raw = transport
            .read(request.block_id, 0, REGISTER_BYTE_SIZE as u32)
            .await?;
        if raw.len() != REGISTER_BYTE_SIZE {
            return Err(Error::format(format!(
                "expected {REGISTER_BYTE_SIZE} bytes when reading SAWLOG register, received {}",
                raw.len()
            )));
        }
        let block = register::decode(&raw)?;
        return Ok(PollData {
            raw,
            records: Some(block.into_records()),
            path: ReadPath::Register,
        });
    }

    let raw = transport
        .read(request.block_id, request.start, request.size)
        .await?;
    let records = if raw.is_empty() {
        None
    } else {
        match record::decode_array_compat(&raw) {
            Ok(records) => Some(records),
            Err(e) => {
                debug!("Payload from DB{} left undecoded: {}", request.block_id, e);
                None
            }
        }
    };

    Ok(PollData {
        raw,
        records,
        path: ReadPath::Range,
    })
}
