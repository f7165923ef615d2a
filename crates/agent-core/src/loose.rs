//! Best-effort reading of free-text steps such as `click "Submit"`.
//!
//! Only the single-agent entry point uses this; the orchestrator consumes
//! the bracketed action grammar.

use url::form_urlencoded;
use webpilot_core_types::grammar::{
    DEFAULT_CLICK_TARGET, DEFAULT_EXTRACT_TARGET, DEFAULT_NAVIGATE_URL, DEFAULT_TYPE_FIELD,
    DEFAULT_WAIT_MS,
};
use webpilot_core_types::{parse_wait_ms, Action};

const SEARCH_ENGINE: &str = "https://www.google.com/search?q=";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LooseStep {
    Act(Action),
    /// Navigation to a results page; observed as `searched:<query>`.
    Search { query: String, action: Action },
    /// Observed as `noop:<reason>`.
    Noop(String),
}

pub fn interpret_loose(step: &str) -> LooseStep {
    let lower = step.trim().to_lowercase();
    let quoted: Vec<&str> = step.split('"').skip(1).step_by(2).collect();

    if lower.starts_with("navigate") || lower.starts_with("open") {
        let url = step
            .split_whitespace()
            .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
            .last()
            .unwrap_or(DEFAULT_NAVIGATE_URL);
        return LooseStep::Act(Action::navigate(url));
    }

    if lower.starts_with("search") {
        let rest = step.trim().splitn(2, char::is_whitespace).nth(1).unwrap_or("");
        let rest = rest.trim_start();
        let lowered = rest.to_lowercase();
        let rest = if lowered == "for" || lowered.starts_with("for ") {
            &rest[3..]
        } else {
            rest
        };
        let query = rest.trim_matches(|c: char| c == '"' || c.is_whitespace());
        if query.is_empty() {
            return LooseStep::Noop("empty-search".to_string());
        }
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        return LooseStep::Search {
            query: query.to_string(),
            action: Action::navigate(format!("{SEARCH_ENGINE}{encoded}")),
        };
    }

    if lower.starts_with("click") {
        let target = quoted
            .first()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CLICK_TARGET);
        return LooseStep::Act(Action::click(target));
    }

    if lower.starts_with("type") || lower.starts_with("fill") {
        let text = quoted.first().copied().unwrap_or("");
        let field = if lower.contains(" into ") {
            quoted.get(1).copied()
        } else {
            None
        }
        .unwrap_or(DEFAULT_TYPE_FIELD);
        return LooseStep::Act(Action::type_into(text, field));
    }

    if lower.starts_with("wait") {
        return LooseStep::Act(Action::wait_ms(parse_wait_ms(step).unwrap_or(DEFAULT_WAIT_MS)));
    }

    if lower.starts_with("extract") || lower.contains("title") {
        let selector = quoted.first().copied().unwrap_or(DEFAULT_EXTRACT_TARGET);
        return LooseStep::Act(Action::extract(selector));
    }

    LooseStep::Noop(step.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_core_types::ActionKind;

    #[test]
    fn navigate_takes_last_url_or_default() {
        assert_eq!(
            interpret_loose("Navigate to https://a.test then https://b.test"),
            LooseStep::Act(Action::navigate("https://b.test"))
        );
        assert_eq!(
            interpret_loose("open the homepage"),
            LooseStep::Act(Action::navigate(DEFAULT_NAVIGATE_URL))
        );
    }

    #[test]
    fn search_encodes_query() {
        match interpret_loose("search for \"rust async book\"") {
            LooseStep::Search { query, action } => {
                assert_eq!(query, "rust async book");
                assert_eq!(
                    action.primary.as_deref(),
                    Some("https://www.google.com/search?q=rust+async+book")
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(interpret_loose("search"), LooseStep::Noop("empty-search".into()));
        assert_eq!(interpret_loose("Search for  "), LooseStep::Noop("empty-search".into()));
    }

    #[test]
    fn click_and_type_use_quoted_segments() {
        assert_eq!(
            interpret_loose("click \"Sign in\""),
            LooseStep::Act(Action::click("Sign in"))
        );
        assert_eq!(
            interpret_loose("click somewhere"),
            LooseStep::Act(Action::click(DEFAULT_CLICK_TARGET))
        );
        assert_eq!(
            interpret_loose("type \"hello\" into \"#q\""),
            LooseStep::Act(Action::type_into("hello", "#q"))
        );
        assert_eq!(
            interpret_loose("fill \"hello\""),
            LooseStep::Act(Action::type_into("hello", DEFAULT_TYPE_FIELD))
        );
    }

    #[test]
    fn wait_extract_and_noop() {
        let LooseStep::Act(wait) = interpret_loose("wait 2s") else {
            panic!("wait should parse");
        };
        assert_eq!((wait.kind, wait.number), (ActionKind::Wait, Some(2000)));
        assert_eq!(
            interpret_loose("Get the page title"),
            LooseStep::Act(Action::extract("title"))
        );
        assert_eq!(
            interpret_loose("extract \"h1\""),
            LooseStep::Act(Action::extract("h1"))
        );
        assert_eq!(interpret_loose("Summarize"), LooseStep::Noop("Summarize".into()));
    }
}
