//! Shared primitives for the WebPilot automation core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod action;
pub mod grammar;

pub use action::{Action, ActionKind};
pub use grammar::{parse_action, parse_wait_ms};

/// Shared error type for URL handling across crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid url: {0}")]
    Invalid(String),
    #[error("url has no host: {0}")]
    MissingHost(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a pooled page handle.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub String);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host portion of a URL, lowercased, without port.
pub fn host_of(raw: &str) -> Result<String, UrlError> {
    let parsed = url::Url::parse(raw).map_err(|_| UrlError::Invalid(raw.to_string()))?;
    parsed
        .host_str()
        .map(|host| host.trim_end_matches('.').to_ascii_lowercase())
        .ok_or_else(|| UrlError::MissingHost(raw.to_string()))
}

/// `scheme://host[:port]` of a URL; the unit of rate limiting.
pub fn origin_of(raw: &str) -> Result<String, UrlError> {
    let parsed = url::Url::parse(raw).map_err(|_| UrlError::Invalid(raw.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UrlError::MissingHost(raw.to_string()))?
        .to_ascii_lowercase();
    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}
