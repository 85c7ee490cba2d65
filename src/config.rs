//! Engine configuration.
//!
//! Every field has a default, so an absent or partial TOML file is valid:
//!
//! ```toml
//! timeout_secs = 15
//! accept_invalid_certs = true
//!
//! [load]
//! thread_count = 20
//! request_count = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ProbeError;

pub const MAX_THREAD_COUNT: usize = 100;
pub const MAX_REQUEST_COUNT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request timeout applied by the HTTP engine.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    /// Upper bound for one TCP-connect latency probe.
    pub ping_timeout_ms: u64,
    pub load: LoadTestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("gauntlet/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
            ping_timeout_ms: 2000,
            load: LoadTestConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProbeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ProbeError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.load.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

/// Load test sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    pub thread_count: usize,
    pub request_count: usize,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            thread_count: 10,
            request_count: 100,
        }
    }
}

impl LoadTestConfig {
    pub fn new(thread_count: usize, request_count: usize) -> Result<Self, ProbeError> {
        let config = Self {
            thread_count,
            request_count,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if !(1..=MAX_THREAD_COUNT).contains(&self.thread_count) {
            return Err(ProbeError::InvalidConfig(format!(
                "thread count must be between 1 and {}, got {}",
                MAX_THREAD_COUNT, self.thread_count
            )));
        }
        if !(1..=MAX_REQUEST_COUNT).contains(&self.request_count) {
            return Err(ProbeError::InvalidConfig(format!(
                "request count must be between 1 and {}, got {}",
                MAX_REQUEST_COUNT, self.request_count
            )));
        }
        Ok(())
    }

    /// Number of workers actually spawned.
    pub fn worker_count(&self) -> usize {
        self.thread_count.min(self.request_count)
    }
}
