pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod session;
pub mod transport;
pub mod utils;

pub use config::{BackoffConfig, ConfigError, Endpoint, ReadRequest, SessionConfig};
pub use error::{Error, Result, TransportError};
pub use gateway::WriteGateway;
pub use models::{Record, RecordDraft, RegisterBlock, Timestamp};
pub use session::{PollData, PollingSession, ReadPath, SessionHandle, SessionStatus, Snapshot};
pub use transport::Transport;
