//! Timing knobs and reports shared by the primitives

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exponential backoff for primitive operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub factor: u32,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 500,
            factor: 2,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self
            .base_backoff_ms
            .saturating_mul(u64::from(self.factor.max(1)).saturating_pow(exp));
        Duration::from_millis(raw.min(self.max_backoff_ms))
    }

    /// Policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Per-operation timeouts, independent of any run-level stop signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub element_ms: u64,
    pub upload_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            element_ms: 10_000,
            upload_ms: 15_000,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_millis(self.upload_ms)
    }
}

/// Outcome of a successful primitive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionReport {
    pub primitive: String,
    pub target: String,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl ActionReport {
    pub(crate) fn finish(
        primitive: &str,
        target: &str,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        let finished_at = Utc::now();
        let latency_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            primitive: primitive.to_string(),
            target: target.to_string(),
            attempts,
            started_at,
            finished_at,
            latency_ms,
        }
    }
}
