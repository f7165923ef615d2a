use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced by page surfaces.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceErrorKind {
    #[error("navigation timed out")]
    NavTimeout,
    #[error("operation timed out")]
    Timeout,
    #[error("target detached")]
    Detached,
    #[error("target element not found")]
    NotFound,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("surface closed")]
    Closed,
    #[error("internal error")]
    Internal,
}

impl SurfaceErrorKind {
    fn default_retriable(self) -> bool {
        matches!(
            self,
            SurfaceErrorKind::NavTimeout
                | SurfaceErrorKind::Timeout
                | SurfaceErrorKind::Detached
                | SurfaceErrorKind::CdpIo
        )
    }
}

/// Error returned by every surface operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceError {
    pub kind: SurfaceErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for SurfaceError {}

impl SurfaceError {
    pub fn new(kind: SurfaceErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: kind.default_retriable(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn nav_timeout(url: &str) -> Self {
        Self::new(SurfaceErrorKind::NavTimeout).with_hint(url.to_string())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::NotFound).with_hint(what)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::Internal).with_hint(msg)
    }

    /// Timeouts and detached targets are worth another attempt.
    pub fn is_transient(&self) -> bool {
        self.retriable
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind,
            SurfaceErrorKind::Timeout | SurfaceErrorKind::NavTimeout
        )
    }
}

impl From<chromiumoxide::error::CdpError> for SurfaceError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;
        match err {
            CdpError::Timeout => SurfaceError::new(SurfaceErrorKind::Timeout),
            other => {
                let message = other.to_string();
                let lowered = message.to_ascii_lowercase();
                let kind = if lowered.contains("detached") || lowered.contains("no node") {
                    SurfaceErrorKind::Detached
                } else if lowered.contains("not found") {
                    SurfaceErrorKind::NotFound
                } else {
                    SurfaceErrorKind::CdpIo
                };
                SurfaceError::new(kind).with_hint(message)
            }
        }
    }
}
