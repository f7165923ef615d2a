use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub browsers: usize,
    pub pages_per_browser: usize,
    pub acquire_timeout_ms: u64,
    /// Temporary handles allowed beyond the pre-allocated capacity.
    pub max_overflow: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            browsers: 2,
            pages_per_browser: 4,
            acquire_timeout_ms: 5_000,
            max_overflow: 4,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn capacity(&self) -> usize {
        self.browsers * self.pages_per_browser
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub started: bool,
    pub slots: usize,
    pub idle: usize,
    pub outstanding: usize,
    pub overflow_live: usize,
}
