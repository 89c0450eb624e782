use std::env;
use std::time::Duration;

use crate::codec::REGISTER_BYTE_SIZE;
use crate::error::{Error, Result};

pub const DEFAULT_RACK: u16 = 0;
pub const DEFAULT_SLOT: u16 = 1;
pub const DEFAULT_TCP_PORT: u16 = 102;
pub const DEFAULT_BLOCK_ID: u16 = 200;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_FLOOR_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_CEILING_MS: u64 = 5000;
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;
pub const DEFAULT_STOP_TICK_MS: u64 = 100;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{key}={value:?} is not valid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Rejected(#[from] Error),
}

/// Where the controller lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub rack: u16,
    pub slot: u16,
    pub tcp_port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Endpoint {
            address: address.into(),
            rack: DEFAULT_RACK,
            slot: DEFAULT_SLOT,
            tcp_port: DEFAULT_TCP_PORT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::validation(
                "address must be a non-empty IP address or hostname",
            ));
        }
        if self.tcp_port == 0 {
            return Err(Error::validation("tcp_port must be in range 1-65535"));
        }
        Ok(())
    }
}

/// A byte range inside one data block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub block_id: u16,
    pub start: u32,
    pub size: u32,
}

impl ReadRequest {
    /// The whole register block at offset 0
    pub fn register(block_id: u16) -> Self {
        ReadRequest {
            block_id,
            start: 0,
            size: REGISTER_BYTE_SIZE as u32,
        }
    }

    /// True when this range is exactly the register block
    pub fn is_full_register(&self) -> bool {
        self.start == 0 && self.size as usize == REGISTER_BYTE_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub floor: Duration,
    pub ceiling: Duration,
    pub factor: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            floor: Duration::from_millis(DEFAULT_BACKOFF_FLOOR_MS),
            ceiling: Duration::from_millis(DEFAULT_BACKOFF_CEILING_MS),
            factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

/// Everything the polling session needs to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub request: ReadRequest,
    pub poll_interval: Duration,
    pub backoff: BackoffConfig,
    /// Granularity at which sleeps check for a stop request
    pub stop_tick: Duration,
}

impl SessionConfig {
    pub fn new(endpoint: Endpoint, request: ReadRequest) -> Self {
        SessionConfig {
            endpoint,
            request,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            backoff: BackoffConfig::default(),
            stop_tick: Duration::from_millis(DEFAULT_STOP_TICK_MS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        if self.backoff.factor == 0 {
            return Err(Error::validation("backoff factor must be at least 1"));
        }
        if self.backoff.ceiling < self.backoff.floor {
            return Err(Error::validation(
                "backoff ceiling must not be below the floor",
            ));
        }
        if self.stop_tick.is_zero() {
            return Err(Error::validation("stop tick must be positive"));
        }
        Ok(())
    }

    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup("SAWLOG_ADDRESS").ok_or(ConfigError::Missing("SAWLOG_ADDRESS"))?;

        let endpoint = Endpoint {
            address: address.trim().to_string(),
            rack: parse_or(&lookup, "SAWLOG_RACK", DEFAULT_RACK)?,
            slot: parse_or(&lookup, "SAWLOG_SLOT", DEFAULT_SLOT)?,
            tcp_port: parse_or(&lookup, "SAWLOG_TCP_PORT", DEFAULT_TCP_PORT)?,
        };

        let request = ReadRequest {
            block_id: parse_or(&lookup, "SAWLOG_DB", DEFAULT_BLOCK_ID)?,
            start: parse_or(&lookup, "SAWLOG_START", 0)?,
            size: parse_or(&lookup, "SAWLOG_SIZE", REGISTER_BYTE_SIZE as u32)?,
        };

        let config = SessionConfig {
            endpoint,
            request,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "SAWLOG_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            backoff: BackoffConfig {
                floor: Duration::from_millis(parse_or(
                    &lookup,
                    "SAWLOG_BACKOFF_FLOOR_MS",
                    DEFAULT_BACKOFF_FLOOR_MS,
                )?),
                ceiling: Duration::from_millis(parse_or(
                    &lookup,
                    "SAWLOG_BACKOFF_CEILING_MS",
                    DEFAULT_BACKOFF_CEILING_MS,
                )?),
                factor: parse_or(&lookup, "SAWLOG_BACKOFF_FACTOR", DEFAULT_BACKOFF_FACTOR)?,
            },
            stop_tick: Duration::from_millis(DEFAULT_STOP_TICK_MS),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> std::result::Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}
