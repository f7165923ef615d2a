//! Permission policy collaborator.
//!
//! Callers ask [`PermissionCheck::check`] before login flows, uploads and
//! navigation outside the allowlist. Kinds the policy does not know are allowed.

pub mod config;

pub use crate::config::{
    load_policy_from_path, parse_policy_str, ConfigError, PermissionPolicy,
};

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

/// Gated action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionKind {
    Login,
    Upload,
    OffAllowlist,
}

impl PermissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Login => "login",
            PermissionKind::Upload => "upload",
            PermissionKind::OffAllowlist => "off-allowlist",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "login" => Some(PermissionKind::Login),
            "upload" => Some(PermissionKind::Upload),
            "off-allowlist" | "off_allowlist" => Some(PermissionKind::OffAllowlist),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary used by the executor and orchestrator.
pub trait PermissionCheck: Send + Sync {
    fn check(&self, kind: &str) -> bool;
}

/// Emitted for every gated decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: PermissionKind,
    pub allowed: bool,
    pub timestamp: SystemTime,
}

/// [`PermissionCheck`] backed by a static [`PermissionPolicy`].
pub struct PolicyPermissions {
    policy: PermissionPolicy,
    audit: broadcast::Sender<AuditEvent>,
}

impl PolicyPermissions {
    pub fn new(policy: PermissionPolicy) -> Self {
        let (audit, _) = broadcast::channel(64);
        Self { policy, audit }
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.audit.subscribe()
    }

    pub fn decide(&self, kind: PermissionKind) -> bool {
        let granted = self.policy.auto_approve
            || match kind {
                PermissionKind::Login => self.policy.allow_login,
                PermissionKind::Upload => self.policy.allow_upload,
                PermissionKind::OffAllowlist => self.policy.allow_off_allowlist,
            };
        if !granted {
            warn!(kind = %kind, "action blocked by permission policy");
        }
        // No subscribers is the common case.
        let _ = self.audit.send(AuditEvent {
            kind,
            allowed: granted,
            timestamp: SystemTime::now(),
        });
        granted
    }
}

impl Default for PolicyPermissions {
    fn default() -> Self {
        Self::new(PermissionPolicy::default())
    }
}

impl PermissionCheck for PolicyPermissions {
    fn check(&self, kind: &str) -> bool {
        match PermissionKind::parse(kind) {
            Some(kind) => self.decide(kind),
            None => true,
        }
    }
}
