/// In-memory controller used by tests and the demo binary.
///
/// Behaviour knobs:
/// - `refuse_connects(n)` → the next `n` connect attempts fail
/// - `drop_link_on_next_read()` → the next read fails and the link goes down
/// - `truncate_next_read(len)` → the next read returns at most `len` bytes
///
/// Every transport handed out by one controller shares the same memory, so a
/// write made through one is visible to reads made through another.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;

use super::Transport;
use crate::config::Endpoint;
use crate::error::TransportError;

#[derive(Debug, Default)]
struct ControllerState {
    blocks: HashMap<u16, Vec<u8>>,
    refuse_connects: u32,
    drop_on_next_read: bool,
    truncate_next_read: Option<usize>,
    connects: u32,
    reads: u32,
    writes: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedController {
    state: Arc<Mutex<ControllerState>>,
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of one data block
    pub fn set_block(&self, block_id: u16, data: Vec<u8>) {
        self.state.lock().blocks.insert(block_id, data);
    }

    pub fn block(&self, block_id: u16) -> Option<Vec<u8>> {
        self.state.lock().blocks.get(&block_id).cloned()
    }

    pub fn refuse_connects(&self, count: u32) {
        self.state.lock().refuse_connects = count;
    }

    pub fn drop_link_on_next_read(&self) {
        self.state.lock().drop_on_next_read = true;
    }

    pub fn truncate_next_read(&self, len: usize) {
        self.state.lock().truncate_next_read = Some(len);
    }

    /// Successful connects so far
    pub fn connect_count(&self) -> u32 {
        self.state.lock().connects
    }

    pub fn read_count(&self) -> u32 {
        self.state.lock().reads
    }

    pub fn write_count(&self) -> u32 {
        self.state.lock().writes
    }

    /// A fresh, disconnected transport onto this controller
    pub fn transport(&self) -> SimulatedTransport {
        SimulatedTransport {
            controller: self.clone(),
            connected: false,
        }
    }
}

#[derive(Debug)]
pub struct SimulatedTransport {
    controller: SimulatedController,
    connected: bool,
}

fn range_of(start: u32, len: usize, block_len: usize) -> Option<std::ops::Range<usize>> {
    let start = start as usize;
    let end = start.checked_add(len)?;
    (end <= block_len).then_some(start..end)
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let mut state = self.controller.state.lock();
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(TransportError::Connect {
                address: endpoint.address.clone(),
                port: endpoint.tcp_port,
                rack: endpoint.rack,
                slot: endpoint.slot,
                message: "connection refused".to_string(),
            });
        }

        state.connects += 1;
        self.connected = true;
        debug!("simulated controller accepted {}", endpoint.address);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read(
        &mut self,
        block_id: u16,
        start: u32,
        size: u32,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let mut state = self.controller.state.lock();
        let failure = |message: &str| TransportError::Read {
            block_id,
            start,
            size,
            message: message.to_string(),
        };

        if state.drop_on_next_read {
            state.drop_on_next_read = false;
            self.connected = false;
            return Err(failure("connection reset by peer"));
        }

        let block = state
            .blocks
            .get(&block_id)
            .ok_or_else(|| failure("block does not exist"))?;
        let range =
            range_of(start, size as usize, block.len()).ok_or_else(|| failure("address out of range"))?;
        let mut data = block[range].to_vec();

        if let Some(len) = state.truncate_next_read.take() {
            data.truncate(len);
        }
        state.reads += 1;
        Ok(data)
    }

    async fn write(
        &mut self,
        block_id: u16,
        start: u32,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let mut state = self.controller.state.lock();
        let failure = |message: &str| TransportError::Write {
            block_id,
            start,
            size: data.len(),
            message: message.to_string(),
        };

        let block = state
            .blocks
            .get_mut(&block_id)
            .ok_or_else(|| failure("block does not exist"))?;
        let range =
            range_of(start, data.len(), block.len()).ok_or_else(|| failure("address out of range"))?;
        block[range].copy_from_slice(data);
        state.writes += 1;
        Ok(())
    }
}
