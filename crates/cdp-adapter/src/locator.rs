use std::fmt;

use serde::{Deserialize, Serialize};

/// Strategy used to find a single element on the active page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    Role { role: String, name: String },
    Placeholder(String),
    Label(String),
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn button(name: impl Into<String>) -> Self {
        Locator::Role {
            role: "button".into(),
            name: name.into(),
        }
    }

    /// Stable string form stored in the selector cache.
    pub fn to_descriptor(&self) -> String {
        match self {
            Locator::Css(selector) => selector.clone(),
            Locator::Role { role, name } => format!("role={role},name={name}"),
            Locator::Placeholder(value) => format!("placeholder={value}"),
            Locator::Label(value) => format!("label={value}"),
            Locator::Text(value) => format!("text={value}"),
        }
    }

    /// Inverse of [`Locator::to_descriptor`]; anything unprefixed is CSS.
    pub fn from_descriptor(descriptor: &str) -> Self {
        if let Some(rest) = descriptor.strip_prefix("role=") {
            if let Some((role, name)) = rest.split_once(",name=") {
                return Locator::Role {
                    role: role.to_string(),
                    name: name.to_string(),
                };
            }
        }
        if let Some(value) = descriptor.strip_prefix("placeholder=") {
            return Locator::Placeholder(value.to_string());
        }
        if let Some(value) = descriptor.strip_prefix("label=") {
            return Locator::Label(value.to_string());
        }
        if let Some(value) = descriptor.strip_prefix("text=") {
            return Locator::Text(value.to_string());
        }
        Locator::Css(descriptor.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_descriptor())
    }
}
