pub mod record;
pub mod register;
pub mod timestamp;

#[cfg(test)]
mod strategies;

pub use record::{LEGACY_RECORD_BYTE_SIZE, RECORD_BYTE_SIZE};
pub use register::REGISTER_BYTE_SIZE;
pub use timestamp::TIMESTAMP_BYTE_SIZE;
