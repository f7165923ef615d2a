use thiserror::Error;
use webpilot_core_types::UrlError;

/// Reasons the gate refuses an operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("navigation blocked by security policy: {0}")]
    OriginDenied(String),
    #[error("rate limit exceeded for origin: {0}")]
    RateLimited(String),
    #[error(transparent)]
    Url(#[from] UrlError),
}
