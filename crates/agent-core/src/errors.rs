use thiserror::Error;

/// Errors emitted by planner implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// Raised when the goal is empty or the planner is misconfigured.
    #[error("invalid planner request: {0}")]
    InvalidRequest(String),

    /// The backing model could not be reached or refused the call.
    #[error("planner unavailable: {0}")]
    Unavailable(String),

    /// The backing model answered with something unusable.
    #[error("planner response invalid: {0}")]
    InvalidResponse(String),
}

impl PlannerError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
