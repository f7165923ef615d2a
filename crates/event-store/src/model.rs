use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webpilot_core_types::RunId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub goal: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_id: RunId,
    /// 1-based position within the run's step log.
    pub index: usize,
    pub action: String,
    pub observation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub run_id: RunId,
    pub name: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Everything recorded for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub steps: Vec<StepRecord>,
    pub artifacts: Vec<ArtifactRecord>,
}

/// Serialized form of the whole store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
    pub runs: Vec<RunRecord>,
    pub steps: Vec<StepRecord>,
    pub artifacts: Vec<ArtifactRecord>,
}
