use serde::{Deserialize, Serialize};

/// Settings consumed by [`crate::SecurityGate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Hosts (and their sub-domains) navigation may reach. Empty denies all.
    pub allowed_domains: Vec<String>,
    pub rate_limit_per_min: u32,
    /// Cookie names allowed to survive [`crate::SecurityGate::filter_cookies`].
    pub cookie_whitelist: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            rate_limit_per_min: 60,
            cookie_whitelist: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
