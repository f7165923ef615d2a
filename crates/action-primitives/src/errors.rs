//! Error types for action primitives

use cdp_adapter::{SurfaceError, SurfaceErrorKind};
use thiserror::Error;

/// Failures of a single primitive operation against a page surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Navigation timed out waiting for the page to load
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Element wait or interaction timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Target detached from the document mid-operation
    #[error("Target detached: {0}")]
    Detached(String),

    /// Element could not be found after waiting
    #[error("Element not found: {0}")]
    NotFound(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Surface was closed underneath the operation
    #[error("Surface closed: {0}")]
    Closed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Transient faults are retried with backoff; everything else fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::NavTimeout(_)
                | ActionError::WaitTimeout(_)
                | ActionError::Detached(_)
                | ActionError::CdpIo(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ActionError::NavTimeout(_) | ActionError::WaitTimeout(_))
    }
}

impl From<SurfaceError> for ActionError {
    fn from(err: SurfaceError) -> Self {
        let detail = err.hint.clone().unwrap_or_else(|| err.kind.to_string());
        match err.kind {
            SurfaceErrorKind::NavTimeout => ActionError::NavTimeout(detail),
            SurfaceErrorKind::Timeout => ActionError::WaitTimeout(detail),
            SurfaceErrorKind::Detached => ActionError::Detached(detail),
            SurfaceErrorKind::NotFound => ActionError::NotFound(detail),
            SurfaceErrorKind::CdpIo if err.retriable => ActionError::CdpIo(detail),
            SurfaceErrorKind::CdpIo | SurfaceErrorKind::Internal => ActionError::Internal(detail),
            SurfaceErrorKind::Closed => ActionError::Closed(detail),
        }
    }
}
