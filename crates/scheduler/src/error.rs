use agent_core::PlannerError;
use browser_pool::PoolError;
use event_store::StoreError;
use thiserror::Error;

/// Faults that end a run. Per-step faults never surface here; they become
/// failure observations and feed replanning.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(#[from] PoolError),
    #[error("planner failed: {0}")]
    Planner(#[from] PlannerError),
    #[error("run store failed: {0}")]
    Store(#[from] StoreError),
    #[error("run task failed: {0}")]
    Task(String),
}

impl RunError {
    /// Fatal faults end the run in the `Failed` state instead of replanning.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::ResourceExhaustion(_) | RunError::Planner(_))
    }
}
