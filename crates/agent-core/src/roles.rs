use std::fmt;

use serde::{Deserialize, Serialize};

/// Executor role a step is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Login,
    Form,
    Research,
    Base,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Login => "login",
            Role::Form => "form",
            Role::Research => "research",
            Role::Base => "base",
        }
    }

    /// Keyword routing; first match wins.
    pub fn classify(step: &str) -> Self {
        let lower = step.to_lowercase();
        if lower.contains("login") || lower.contains("sign in") {
            Role::Login
        } else if ["form", "fill", "submit"].iter().any(|kw| lower.contains(kw)) {
            Role::Form
        } else if ["research", "search", "summarize"]
            .iter()
            .any(|kw| lower.contains(kw))
        {
            Role::Research
        } else {
            Role::Base
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
