//! Driver configuration
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "read_timeout_ms": 50 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::protocol::{
    LinkSettings, ProtocolError, ReaderTiming, DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_READ_TIMEOUT_MS, READ_CHUNK_SIZE,
};

/// Link and reader timing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Upper bound for one bounded read, in milliseconds
    pub read_timeout_ms: u64,
    /// Pause between reader iterations, in milliseconds
    pub poll_interval_ms: u64,
    /// Capacity of the fixed read chunk, in bytes
    pub read_chunk_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reject values the reader cannot work with
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::Config("baud_rate must be positive".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ProtocolError::Config(
                "read_timeout_ms must be positive".into(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(ProtocolError::Config(
                "read_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Settings handed to the transport on open
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// Timing handed to the frame reader
    pub fn reader_timing(&self) -> ReaderTiming {
        ReaderTiming {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            chunk_size: self.read_chunk_size,
        }
    }
}
