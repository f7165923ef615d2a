//! Error types for target resolution

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Every stage failed; `attempted` lists descriptors in the order tried.
    #[error("could not resolve '{target}' (tried {})", .attempted.join(" | "))]
    ResolutionExhausted {
        target: String,
        attempted: Vec<String>,
    },
}

impl LocatorError {
    pub fn attempted(&self) -> &[String] {
        match self {
            LocatorError::ResolutionExhausted { attempted, .. } => attempted,
        }
    }
}
