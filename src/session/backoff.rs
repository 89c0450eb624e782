/// Reconnect delay schedule: starts at the floor, multiplies per failure, capped at the ceiling
use std::time::Duration;

use crate::config::BackoffConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Backoff {
            current: config.floor.min(config.ceiling),
            config,
        }
    }

    /// Delay the next failure will wait
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the delay for this failure and grow the one after it
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = delay
            .checked_mul(self.config.factor)
            .unwrap_or(self.config.ceiling)
            .min(self.config.ceiling);
        delay
    }

    /// Back to the floor after a successful connect
    pub fn reset(&mut self) {
        self.current = self.config.floor.min(self.config.ceiling);
    }
}
