/// Controller transport seam.
///
/// The link-layer protocol lives outside this crate. The poller and the write
/// gateway only see this trait; `SimulatedController` implements
/// it in memory.
use async_trait::async_trait;

use crate::config::Endpoint;
use crate::error::TransportError;

pub mod simulated;

pub use simulated::{SimulatedController, SimulatedTransport};

#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// Close the link. Calling this while already disconnected is a no-op.
    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    async fn read(
        &mut self,
        block_id: u16,
        start: u32,
        size: u32,
    ) -> Result<Vec<u8>, TransportError>;

    async fn write(&mut self, block_id: u16, start: u32, data: &[u8])
        -> Result<(), TransportError>;
}
