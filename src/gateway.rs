/// Single-record write-back to the register block
///
/// The gateway owns its own transport, separate from any polling session, and
/// holds the link open only for the duration of one write. A poll already in
/// flight may still return the old bytes after a write lands.
use log::{info, warn};

use crate::codec::{record, RECORD_BYTE_SIZE};
use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::models::Record;
use crate::transport::Transport;

/// Absolute byte offset of record `index` in a block whose records start at `base_offset`
pub fn record_offset(index: i64, base_offset: u32) -> Result<u32> {
    if index < 0 {
        return Err(Error::validation(format!(
            "index must be non-negative, got {index}"
        )));
    }
    let stride = RECORD_BYTE_SIZE as i64;
    index
        .checked_mul(stride)
        .and_then(|delta| delta.checked_add(i64::from(base_offset)))
        .and_then(|offset| u32::try_from(offset).ok())
        .ok_or_else(|| {
            Error::validation(format!(
                "record {index} at base offset {base_offset} lies beyond the addressable block"
            ))
        })
}

pub struct WriteGateway<T> {
    transport: T,
    endpoint: Endpoint,
    block_id: u16,
}

impl<T: Transport> WriteGateway<T> {
    pub fn new(transport: T, endpoint: Endpoint, block_id: u16) -> Self {
        WriteGateway {
            transport,
            endpoint,
            block_id,
        }
    }

    /// Encode `record` and write it over slot `index`
    ///
    /// Connects if needed and always disconnects before returning. Transport
    /// failures are returned as-is; nothing is retried. Returns the absolute
    /// offset that was written.
    pub async fn write_record(
        &mut self,
        index: i64,
        record: &Record,
        base_offset: u32,
    ) -> Result<u32> {
        let offset = record_offset(index, base_offset)?;
        let payload = record::encode(record);

        let result = self.write_scoped(offset, &payload).await;
        self.transport.disconnect().await;

        match &result {
            Ok(()) => info!(
                "Wrote SAWLOG record {} to DB{} @ {}",
                index, self.block_id, offset
            ),
            Err(e) => warn!(
                "Write of SAWLOG record {} to DB{} @ {} failed: {}",
                index, self.block_id, offset, e
            ),
        }
        result.map(|()| offset)
    }

    async fn write_scoped(&mut self, offset: u32, payload: &[u8]) -> Result<()> {
        if !self.transport.is_connected() {
            self.transport.connect(&self.endpoint).await?;
        }
        self.transport.write(self.block_id, offset, payload).await?;
        Ok(())
    }
}
