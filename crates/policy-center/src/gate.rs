use std::borrow::Cow;

use dashmap::DashMap;
use regex::Regex;
use tracing::{error, warn};
use webpilot_core_types::{host_of, origin_of};

use crate::errors::GateError;
use crate::model::{CookieRecord, SecurityPolicy};
use crate::rate::RateBucket;

/// Allowlist, per-origin rate limiting and input sanitizing.
pub struct SecurityGate {
    allowed: Vec<String>,
    rate_limit_per_min: u32,
    cookie_whitelist: Vec<String>,
    buckets: DashMap<String, RateBucket>,
    injection: Regex,
}

impl SecurityGate {
    pub fn new(policy: &SecurityPolicy) -> Self {
        let allowed = policy
            .allowed_domains
            .iter()
            .map(|entry| normalize_domain(entry))
            .filter(|entry| !entry.is_empty())
            .collect();
        Self {
            allowed,
            rate_limit_per_min: policy.rate_limit_per_min,
            cookie_whitelist: policy.cookie_whitelist.clone(),
            buckets: DashMap::new(),
            injection: Regex::new(r"(?i)<\s*script|javascript\s*:|\bon[a-z]+\s*=")
                .expect("static pattern"),
        }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed
    }

    /// True iff the host equals or is a sub-domain of an allowlist entry.
    pub fn is_origin_allowed(&self, url: &str) -> bool {
        let Ok(host) = host_of(url) else {
            error!(%url, "blocked navigation to unparsable url");
            return false;
        };
        let allowed = self
            .allowed
            .iter()
            .any(|entry| host == *entry || host.ends_with(&format!(".{entry}")));
        if !allowed {
            error!(%host, "blocked navigation to non-allowed domain");
        }
        allowed
    }

    /// Consumes one token from the bucket of the URL's origin.
    pub fn enforce_rate(&self, url: &str) -> bool {
        let origin = match origin_of(url) {
            Ok(origin) => origin,
            Err(err) => {
                warn!(%url, error = %err, "rate check on unparsable url");
                return false;
            }
        };
        let limit = self.rate_limit_per_min;
        // The entry guard holds the shard lock, so creation and consumption are atomic per origin.
        let mut bucket = self
            .buckets
            .entry(origin.clone())
            .or_insert_with(|| RateBucket::per_minute(limit));
        let allowed = bucket.try_consume(1.0);
        if !allowed {
            warn!(%origin, "rate limit exceeded");
        }
        allowed
    }

    /// Both checks in order, as a typed result.
    pub fn check_navigation(&self, url: &str) -> Result<(), GateError> {
        host_of(url)?;
        if !self.is_origin_allowed(url) {
            return Err(GateError::OriginDenied(url.to_string()));
        }
        if !self.enforce_rate(url) {
            return Err(GateError::RateLimited(origin_of(url)?));
        }
        Ok(())
    }

    /// Strips angle brackets when the text carries script-like markers.
    pub fn sanitize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.injection.is_match(text) {
            warn!("sanitized potentially unsafe input");
            Cow::Owned(text.replace(&['<', '>'][..], ""))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Keeps cookies named on the whitelist; an empty whitelist keeps none.
    pub fn filter_cookies(&self, cookies: Vec<CookieRecord>) -> Vec<CookieRecord> {
        if self.cookie_whitelist.is_empty() {
            return Vec::new();
        }
        cookies
            .into_iter()
            .filter(|cookie| self.cookie_whitelist.iter().any(|name| *name == cookie.name))
            .collect()
    }

    pub fn bucket_tokens(&self, url: &str) -> Option<f64> {
        let origin = origin_of(url).ok()?;
        self.buckets.get(&origin).map(|bucket| bucket.tokens())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

fn normalize_domain(entry: &str) -> String {
    entry
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}
