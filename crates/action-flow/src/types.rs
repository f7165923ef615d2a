//! Executor configuration

use action_primitives::{RetryPolicy, Timeouts};
use serde::{Deserialize, Serialize};

/// Which target resolver the executor is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Memory, CSS, role/label, semantic and text stages
    #[default]
    FallbackChain,
    /// CSS selector only
    Direct,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub resolver: ResolverKind,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
}
