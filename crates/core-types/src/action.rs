use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of actions the executor understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Wait,
    Scroll,
    Extract,
    Upload,
    NewTab,
    SwitchTab,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::Scroll => "scroll",
            ActionKind::Extract => "extract",
            ActionKind::Upload => "upload",
            ActionKind::NewTab => "new_tab",
            ActionKind::SwitchTab => "switch_tab",
        }
    }

    /// Name used when rendering back into the bracketed grammar.
    fn grammar_name(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "open",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed step. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            primary: None,
            secondary: None,
            number: None,
        }
    }

    pub fn with_primary(mut self, value: impl Into<String>) -> Self {
        self.primary = Some(value.into());
        self
    }

    pub fn with_secondary(mut self, value: impl Into<String>) -> Self {
        self.secondary = Some(value.into());
        self
    }

    pub fn with_number(mut self, value: i64) -> Self {
        self.number = Some(value);
        self
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(ActionKind::Navigate).with_primary(url)
    }

    pub fn click(target: impl Into<String>) -> Self {
        Self::new(ActionKind::Click).with_primary(target)
    }

    pub fn type_into(text: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ActionKind::Type)
            .with_primary(text)
            .with_secondary(field)
    }

    pub fn wait_ms(ms: i64) -> Self {
        Self::new(ActionKind::Wait).with_number(ms)
    }

    pub fn extract(selector: impl Into<String>) -> Self {
        Self::new(ActionKind::Extract).with_primary(selector)
    }

    pub fn primary_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.primary.as_deref().unwrap_or(default)
    }

    pub fn secondary_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.secondary.as_deref().unwrap_or(default)
    }
}

fn quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', ""))
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args: Vec<String> = Vec::new();
        if let Some(primary) = &self.primary {
            args.push(quote(primary));
        }
        if let Some(secondary) = &self.secondary {
            if self.primary.is_none() {
                args.push(quote(""));
            }
            args.push(quote(secondary));
        }
        if let Some(number) = self.number {
            args.push(number.to_string());
        }
        write!(f, "{}({})", self.kind.grammar_name(), args.join(", "))
    }
}
