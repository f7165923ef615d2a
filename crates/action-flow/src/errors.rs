//! Step execution error types

use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

/// Why a single action failed. Every variant is a per-step fault that the
/// orchestrator turns into a failure observation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Origin outside the allowlist or rate limit exhausted
    #[error("Policy denied: {0}")]
    PolicyDenied(String),

    /// Permission policy refused the action kind
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Timeout or detached target that survived every retry
    #[error("Transient fault: {0}")]
    Transient(ActionError),

    #[error("Resolution exhausted for '{target}' (tried {})", .attempted.join(" | "))]
    ResolutionExhausted {
        target: String,
        attempted: Vec<String>,
    },

    /// Missing file or element
    #[error("Not found: {0}")]
    NotFound(String),

    /// Closed surface or protocol failure that retrying cannot fix
    #[error("Surface failure: {0}")]
    Surface(ActionError),
}

impl ExecError {
    pub fn is_policy(&self) -> bool {
        matches!(self, ExecError::PolicyDenied(_) | ExecError::NotPermitted(_))
    }
}

impl From<ActionError> for ExecError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::NotFound(what) => ExecError::NotFound(what),
            err if err.is_retryable() => ExecError::Transient(err),
            err => ExecError::Surface(err),
        }
    }
}

impl From<LocatorError> for ExecError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ResolutionExhausted { target, attempted } => {
                ExecError::ResolutionExhausted { target, attempted }
            }
        }
    }
}

impl From<cdp_adapter::SurfaceError> for ExecError {
    fn from(err: cdp_adapter::SurfaceError) -> Self {
        ActionError::from(err).into()
    }
}
