//! Permission policy definition and loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flags gating sensitive actions. Everything defaults to denied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionPolicy {
    pub allow_login: bool,
    pub allow_upload: bool,
    pub allow_off_allowlist: bool,
    /// Grants every gated kind.
    pub auto_approve: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading permission policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid permission policy: {0}")]
    Invalid(String),
}

pub fn load_policy_from_path(path: impl AsRef<Path>) -> Result<PermissionPolicy, ConfigError> {
    let raw = fs::read_to_string(path.as_ref())?;
    parse_policy_str(&raw)
}

/// JSON or YAML; YAML parsing covers both.
pub fn parse_policy_str(raw: &str) -> Result<PermissionPolicy, ConfigError> {
    serde_yaml::from_str(raw).map_err(|err| ConfigError::Invalid(err.to_string()))
}
