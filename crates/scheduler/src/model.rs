use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use webpilot_core_types::RunId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Replans allowed before the run ends as `Exhausted`.
    pub max_replans: u32,
    /// Characters of page content folded into failure observations.
    pub snapshot_chars: usize,
    /// Observations kept in the trailing summary artifact.
    pub summary_tail: usize,
    /// Step-log entries handed to the planner as recent context.
    pub context_limit: usize,
    pub screenshots_dir: Option<PathBuf>,
    /// Read steps that do not parse as actions with the free-text adapter.
    pub loose_steps: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_replans: 3,
            snapshot_chars: 2_000,
            summary_tail: 5,
            context_limit: 10,
            screenshots_dir: None,
            loose_steps: false,
        }
    }
}

/// Control-loop position. Only the last four are terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Planning,
    Executing(usize),
    Validating { index: usize, observation: String },
    Replanning { failure: String },
    Completed,
    Aborted,
    Exhausted,
    Failed,
}

impl RunState {
    pub fn outcome(&self) -> Option<RunOutcome> {
        match self {
            RunState::Completed => Some(RunOutcome::Completed),
            RunState::Aborted => Some(RunOutcome::Aborted),
            RunState::Exhausted => Some(RunOutcome::Exhausted),
            RunState::Failed => Some(RunOutcome::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step of the last plan passed validation.
    Completed,
    /// The stop signal was seen at a step boundary.
    Aborted,
    /// Replan bound reached.
    Exhausted,
    /// Resource exhaustion or planner failure.
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Aborted => "aborted",
            RunOutcome::Exhausted => "exhausted",
            RunOutcome::Failed => "failed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub goal: String,
    pub outcome: RunOutcome,
    pub analysis: Option<String>,
    /// Plan in force when the run ended.
    pub plan: Vec<String>,
    pub observations: Vec<String>,
    pub replans: u32,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
