//! Application configuration.
//!
//! Values are layered in order: built-in defaults, the YAML file, then
//! `WEBPILOT__SECTION__KEY` environment overlays, then the legacy variables
//! (`ALLOWED_DOMAINS`, `OPENAI_API_KEY`, ...). CLI flags are applied last by
//! the command that owns them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use action_flow::ExecutorConfig;
use agent_core::PlannerConfig;
use browser_pool::PoolConfig;
use cdp_adapter::ChromiumConfig;
use permissions_broker::PermissionPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use webpilot_policy_center::SecurityPolicy;
use webpilot_scheduler::OrchestratorConfig;

pub const ENV_PREFIX: &str = "WEBPILOT__";
pub const DEFAULT_CONFIG_PATH: &str = "config/webpilot.yaml";

/// Legacy variable name, dotted path, and whether the value is always a string.
const LEGACY_ENV: [(&str, &str, bool); 7] = [
    ("ALLOWED_DOMAINS", "security.allowed_domains", false),
    ("COOKIE_WHITELIST", "security.cookie_whitelist", false),
    ("RATE_LIMIT_PER_MIN", "security.rate_limit_per_min", false),
    ("ALLOW_LOGIN", "permissions.allow_login", false),
    ("ALLOW_UPLOAD", "permissions.allow_upload", false),
    ("OPENAI_API_KEY", "planner.api_key", true),
    ("OPENAI_MODEL", "planner.model", true),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {message}")]
    Io { path: String, message: String },
    #[error("parsing {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    #[default]
    Chromium,
    /// In-memory demo site; no browser needed.
    Stub,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub driver: DriverKind,
    pub chromium: ChromiumConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// JSON file backing the selector cache; in-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing run records; in-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub security: SecurityPolicy,
    pub permissions: PermissionPolicy,
    pub pool: PoolConfig,
    pub executor: ExecutorConfig,
    pub orchestrator: OrchestratorConfig,
    pub memory: MemoryConfig,
    pub store: StoreConfig,
    pub planner: PlannerConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug)]
pub struct LoadOptions {
    /// Explicit file; when `None` the default path is used if it exists.
    pub path: Option<PathBuf>,
    pub include_env: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            path: None,
            include_env: true,
        }
    }
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// File that contributed values, if any.
    pub path: Option<PathBuf>,
}

struct Overlay {
    path: String,
    value: Value,
}

pub fn load_config(options: &LoadOptions) -> Result<LoadedConfig, ConfigError> {
    load_config_with_vars(options, env::vars())
}

/// Same as [`load_config`] with an explicit environment.
pub fn load_config_with_vars<I>(options: &LoadOptions, vars: I) -> Result<LoadedConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut doc = serde_json::to_value(AppConfig::default())
        .map_err(|err| ConfigError::Invalid(err.to_string()))?;

    let path = match &options.path {
        Some(explicit) => Some(explicit.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
    };
    if let Some(path) = &path {
        apply_overlays(&mut doc, overlays_from_file(path)?)?;
    }

    if options.include_env {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        apply_overlays(&mut doc, overlays_from_env(&vars))?;
        apply_overlays(&mut doc, overlays_from_legacy_env(&vars))?;
    }

    let config =
        serde_json::from_value(doc).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    Ok(LoadedConfig { config, path })
}

fn overlays_from_file(path: &Path) -> Result<Vec<Overlay>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parse_err = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| parse_err(err.to_string()))?;
    let json = serde_json::to_value(yaml).map_err(|err| parse_err(err.to_string()))?;
    debug!(path = %path.display(), "configuration file read");
    Ok(flatten_value(json, None))
}

fn overlays_from_env(vars: &[(String, String)]) -> Vec<Overlay> {
    vars.iter()
        .filter_map(|(key, raw)| {
            let stripped = key.strip_prefix(ENV_PREFIX)?;
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                return None;
            }
            Some(Overlay {
                path,
                value: parse_env_value(raw),
            })
        })
        .collect()
}

fn overlays_from_legacy_env(vars: &[(String, String)]) -> Vec<Overlay> {
    LEGACY_ENV
        .iter()
        .filter_map(|(name, path, verbatim)| {
            let (_, raw) = vars.iter().find(|(key, _)| key == name)?;
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            let value = if *verbatim {
                Value::String(raw.to_string())
            } else {
                parse_env_value(raw)
            };
            Some(Overlay {
                path: path.to_string(),
                value,
            })
        })
        .collect()
}

fn apply_overlays(doc: &mut Value, overlays: Vec<Overlay>) -> Result<(), ConfigError> {
    for overlay in overlays {
        let segments: Vec<&str> = overlay.path.split('.').collect();
        let value = coerce_to_existing(get_json_value(doc, &segments), overlay.value);
        set_json_value(doc, &segments, value)?;
    }
    Ok(())
}

/// Comma lists become arrays where the current value is an array, scalars
/// become strings where the current value is a string, and flag fields accept
/// `1`/`0`, `yes`/`no` and `on`/`off`.
fn coerce_to_existing(existing: Option<&Value>, value: Value) -> Value {
    match (existing, value) {
        (Some(Value::Array(_)), Value::String(raw)) => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        (Some(Value::String(_)), Value::Number(n)) => Value::String(n.to_string()),
        (Some(Value::String(_)), Value::Bool(b)) => Value::String(b.to_string()),
        (Some(Value::Bool(_)), Value::Number(n)) => Value::Bool(n.as_f64() != Some(0.0)),
        (Some(Value::Bool(_)), Value::String(raw)) => Value::Bool(flag_from_str(&raw)),
        (_, value) => value,
    }
}

/// Any non-empty value other than an explicit negative enables a flag.
fn flag_from_str(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

pub(crate) fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>) -> Vec<Overlay> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .flat_map(|(key, value)| {
                let segment = key.trim().to_ascii_lowercase();
                let next = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{prefix}.{segment}"),
                    _ => segment,
                };
                flatten_value(value, Some(next))
            })
            .collect(),
        other => match prefix {
            Some(path) => vec![Overlay { path, value: other }],
            None => Vec::new(),
        },
    }
}

pub(crate) fn set_json_value(
    target: &mut Value,
    path: &[&str],
    value: Value,
) -> Result<(), ConfigError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(ConfigError::Invalid("configuration key cannot be empty".into()));
    };
    let mut current = target;
    for segment in parents {
        current = ensure_object(current, segment)?
            .entry((*segment).to_string())
            .or_insert(Value::Null);
    }
    ensure_object(current, last)?.insert((*last).to_string(), value);
    Ok(())
}

fn ensure_object<'a>(
    value: &'a mut Value,
    segment: &str,
) -> Result<&'a mut Map<String, Value>, ConfigError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| {
        ConfigError::Invalid(format!(
            "{segment} resolves to a non-object value; cannot assign nested configuration"
        ))
    })
}

pub(crate) fn get_json_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get_nested_keys() {
        let mut doc = json!({});
        set_json_value(&mut doc, &["pool", "browsers"], json!(3)).unwrap();
        assert_eq!(get_json_value(&doc, &["pool", "browsers"]), Some(&json!(3)));
        assert!(set_json_value(&mut doc, &["pool", "browsers", "x"], json!(1)).is_err());
    }

    #[test]
    fn env_values_parse_in_order() {
        assert_eq!(parse_env_value("true"), json!(true));
        assert_eq!(parse_env_value("42"), json!(42));
        assert_eq!(parse_env_value("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_env_value("plain"), json!("plain"));
        assert_eq!(parse_env_value(""), Value::Null);
    }

    #[test]
    fn comma_lists_fill_array_fields() {
        let existing = json!([]);
        assert_eq!(
            coerce_to_existing(Some(&existing), json!("a.com, b.com,")),
            json!(["a.com", "b.com"])
        );
        assert_eq!(
            coerce_to_existing(Some(&json!("gpt")), json!(4)),
            json!("4")
        );
    }

    #[test]
    fn flag_fields_accept_numeric_and_word_values() {
        let existing = json!(false);
        assert_eq!(coerce_to_existing(Some(&existing), json!(1)), json!(true));
        assert_eq!(coerce_to_existing(Some(&existing), json!(0)), json!(false));
        assert_eq!(coerce_to_existing(Some(&existing), json!("yes")), json!(true));
        assert_eq!(coerce_to_existing(Some(&existing), json!("Off")), json!(false));
        assert_eq!(coerce_to_existing(Some(&existing), json!("enabled")), json!(true));
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert!(cfg.security.allowed_domains.is_empty());
        assert_eq!(cfg.security.rate_limit_per_min, 60);
        assert_eq!(cfg.pool.browsers, 2);
        assert_eq!(cfg.pool.pages_per_browser, 4);
        assert_eq!(cfg.orchestrator.max_replans, 3);
        assert_eq!(cfg.orchestrator.snapshot_chars, 2_000);
        assert_eq!(cfg.executor.retry.max_attempts, 3);
        assert_eq!(cfg.browser.driver, DriverKind::Chromium);
    }
}
