//! Core types for target resolution

use serde::{Deserialize, Serialize};
use webpilot_core_types::ActionKind;

/// Resolution stages in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Descriptors that succeeded before for this origin and label
    Memory,
    /// The target string as a CSS selector
    Literal,
    /// Accessible role/name for clicks, placeholder then label for fills
    Structural,
    /// Best-ranked live candidate, looked up by its label
    Semantic,
    /// Plain visible-text match
    Text,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Memory => "memory",
            Stage::Literal => "literal",
            Stage::Structural => "structural",
            Stage::Semantic => "semantic",
            Stage::Text => "text",
        }
    }

    /// Fresh successes are recorded; memory hits are not re-inserted.
    pub fn records_success(&self) -> bool {
        !matches!(self, Stage::Memory)
    }
}

/// What to do with the element once found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOp<'a> {
    Click,
    Fill(&'a str),
}

impl TargetOp<'_> {
    pub fn action_kind(&self) -> ActionKind {
        match self {
            TargetOp::Click => ActionKind::Click,
            TargetOp::Fill(_) => ActionKind::Type,
        }
    }
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Exact descriptor that worked.
    pub descriptor: String,
    pub stage: Stage,
    /// Descriptors that failed before the winning one.
    pub attempted: Vec<String>,
}
