/// Error types shared by the codecs, the poller and the write gateway
use thiserror::Error;

/// Failures reported at the transport boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("connect to {address}:{port} (rack {rack}, slot {slot}) failed: {message}")]
    Connect {
        address: String,
        port: u16,
        rack: u16,
        slot: u16,
        message: String,
    },

    #[error("read of DB{block_id} offset {start} size {size} failed: {message}")]
    Read {
        block_id: u16,
        start: u32,
        size: u32,
        message: String,
    },

    #[error("write to DB{block_id} offset {start} size {size} failed: {message}")]
    Write {
        block_id: u16,
        start: u32,
        size: usize,
        message: String,
    },
}

/// Crate-wide error, tagged by failure class so callers can match on it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructed value or write request broke a range or length rule
    #[error("validation error: {0}")]
    Validation(String),

    /// A byte buffer does not fit the requested layout
    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
