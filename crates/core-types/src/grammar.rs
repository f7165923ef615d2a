//! Bracketed action grammar: `name(arg1, "quoted, arg2", ...)`.
//!
//! This is the canonical representation consumed by the executor. Unknown
//! names and malformed input yield `None`.

use crate::action::{Action, ActionKind};

pub const DEFAULT_CLICK_TARGET: &str = "a, button";
pub const DEFAULT_TYPE_FIELD: &str = "input, textarea";
pub const DEFAULT_WAIT_MS: i64 = 1000;
pub const DEFAULT_SCROLL_PX: i64 = 800;
pub const DEFAULT_EXTRACT_TARGET: &str = "title";
pub const DEFAULT_UPLOAD_TARGET: &str = "input[type=file]";
pub const DEFAULT_NAVIGATE_URL: &str = "https://example.com";
pub const DEFAULT_NEW_TAB_URL: &str = "about:blank";

pub fn parse_action(step: &str) -> Option<Action> {
    let trimmed = step.trim();
    if !trimmed.ends_with(')') {
        return None;
    }
    let (name, rest) = trimmed.split_once('(')?;
    let name = name.trim().to_ascii_lowercase();
    let args = split_args(&rest[..rest.len() - 1]);
    let arg = |idx: usize| args.get(idx).cloned();

    let action = match name.as_str() {
        "open" | "open_url" => Action {
            primary: arg(0),
            ..Action::new(ActionKind::Navigate)
        },
        "click" => Action {
            primary: arg(0),
            ..Action::new(ActionKind::Click)
        },
        "type" | "fill" => Action::type_into(
            arg(0).unwrap_or_default(),
            arg(1).unwrap_or_else(|| DEFAULT_TYPE_FIELD.to_string()),
        ),
        "wait" => Action::wait_ms(arg(0).as_deref().and_then(parse_wait_ms).unwrap_or(DEFAULT_WAIT_MS)),
        "scroll" => {
            Action::new(ActionKind::Scroll).with_number(parse_int(arg(0)).unwrap_or(DEFAULT_SCROLL_PX))
        }
        "extract" => Action::extract(arg(0).unwrap_or_else(|| DEFAULT_EXTRACT_TARGET.to_string())),
        "upload" => Action::new(ActionKind::Upload)
            .with_primary(arg(0).unwrap_or_else(|| DEFAULT_UPLOAD_TARGET.to_string()))
            .with_secondary(arg(1).unwrap_or_default()),
        "new_tab" => Action {
            primary: arg(0),
            ..Action::new(ActionKind::NewTab)
        },
        "switch_tab" => Action::new(ActionKind::SwitchTab).with_number(parse_int(arg(0)).unwrap_or(0)),
        _ => return None,
    };
    Some(action)
}

/// Splits on commas outside double quotes; quote characters are dropped.
fn split_args(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Reads the first number in `raw` with an optional `ms`/`s` unit; bare numbers are milliseconds.
pub fn parse_wait_ms(raw: &str) -> Option<i64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let tail = &raw[start..];
    let end = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    let value: f64 = tail[..end].trim_end_matches('.').parse().ok()?;
    let unit = tail[end..].trim_start().to_ascii_lowercase();
    let millis = if unit.starts_with("ms") {
        value
    } else if unit.starts_with('s') {
        value * 1000.0
    } else {
        value
    };
    Some(millis.round() as i64)
}

fn parse_int(raw: Option<String>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_alias_and_quoted_commas() {
        let action = parse_action("open_url(\"https://example.com\")").unwrap();
        assert_eq!(action.kind, ActionKind::Navigate);
        assert_eq!(action.primary.as_deref(), Some("https://example.com"));

        let action = parse_action("click(\"Save, then close\")").unwrap();
        assert_eq!(action.primary.as_deref(), Some("Save, then close"));
    }

    #[test]
    fn applies_defaults() {
        let ty = parse_action("fill(\"hello\")").unwrap();
        assert_eq!(ty.kind, ActionKind::Type);
        assert_eq!(ty.secondary.as_deref(), Some(DEFAULT_TYPE_FIELD));

        assert_eq!(parse_action("wait(soon)").unwrap().number, Some(1000));
        assert_eq!(parse_action("scroll()").unwrap().number, Some(800));
        assert_eq!(parse_action("extract()").unwrap().primary.as_deref(), Some("title"));

        let upload = parse_action("upload()").unwrap();
        assert_eq!(upload.primary.as_deref(), Some(DEFAULT_UPLOAD_TARGET));
        assert_eq!(upload.secondary.as_deref(), Some(""));

        assert_eq!(parse_action("switch_tab(2)").unwrap().number, Some(2));
        assert!(parse_action("click()").unwrap().primary.is_none());
    }

    #[test]
    fn wait_understands_units() {
        assert_eq!(parse_action("wait(2s)").unwrap().number, Some(2000));
        assert_eq!(parse_action("wait(250 ms)").unwrap().number, Some(250));
        assert_eq!(parse_wait_ms("wait 1.5 s please"), Some(1500));
        assert_eq!(parse_wait_ms("750"), Some(750));
        assert_eq!(parse_wait_ms("a moment"), None);
    }

    #[test]
    fn rejects_unknown_or_malformed() {
        assert!(parse_action("hover(\"x\")").is_none());
        assert!(parse_action("click \"x\"").is_none());
        assert!(parse_action("Open the page").is_none());
    }

    #[test]
    fn display_is_reparseable() {
        let action = Action::type_into("a, b", "#q");
        let rendered = action.to_string();
        assert_eq!(rendered, "type(\"a, b\", \"#q\")");
        assert_eq!(parse_action(&rendered), Some(action));
    }
}
