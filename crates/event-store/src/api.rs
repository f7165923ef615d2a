use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};
use webpilot_core_types::RunId;

use crate::errors::{StoreError, StoreErrorKind};
use crate::model::{ArtifactRecord, RunLog, RunRecord, StepRecord, StoreSnapshot};

pub type StoreResult<T> = Result<T, StoreError>;

/// Run bookkeeping collaborator. Runs, steps and artifacts are append-only.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, goal: &str) -> StoreResult<RunId>;
    async fn add_step(
        &self,
        run: &RunId,
        index: usize,
        action: &str,
        observation: &str,
    ) -> StoreResult<()>;
    async fn add_artifact(&self, run: &RunId, name: &str, payload: &str) -> StoreResult<()>;
    /// Latest goal followed by the last `limit` `action -> observation` pairs.
    async fn recent_context(&self, limit: usize) -> StoreResult<String>;
    async fn run(&self, id: &RunId) -> StoreResult<Option<RunRecord>>;
    async fn run_log(&self, id: &RunId) -> StoreResult<RunLog>;
}

#[derive(Default)]
struct State {
    runs: Vec<RunRecord>,
    steps: Vec<StepRecord>,
    artifacts: Vec<ArtifactRecord>,
}

impl State {
    fn ensure_run(&self, id: &RunId) -> StoreResult<()> {
        if self.runs.iter().any(|run| &run.id == id) {
            Ok(())
        } else {
            Err(StoreError::unknown_run(id.to_string()))
        }
    }
}

/// In-process store, optionally mirrored to a JSON file after every append.
#[derive(Default)]
pub struct InMemoryRunStore {
    state: RwLock<State>,
    path: Option<PathBuf>,
    persist_lock: AsyncMutex<()>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` when it exists and keeps it updated afterwards.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = State::default();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|err| StoreError::new(StoreErrorKind::Load(err.to_string())))?;
            if !bytes.is_empty() {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|err| StoreError::new(StoreErrorKind::Load(err.to_string())))?;
                state.runs = snapshot.runs;
                state.steps = snapshot.steps;
                state.artifacts = snapshot.artifacts;
            }
            debug!(path = %path.display(), runs = state.runs.len(), "run store loaded");
        }
        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
            persist_lock: AsyncMutex::new(()),
        })
    }

    pub fn run_count(&self) -> usize {
        self.state.read().runs.len()
    }

    async fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        let bytes = {
            let state = self.state.read();
            let snapshot = StoreSnapshot {
                runs: state.runs.clone(),
                steps: state.steps.clone(),
                artifacts: state.artifacts.clone(),
            };
            serde_json::to_vec_pretty(&snapshot)
                .map_err(|err| StoreError::new(StoreErrorKind::Persist(err.to_string())))?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::new(StoreErrorKind::Persist(err.to_string())))?;
        }
        tokio::fs::write(path, bytes).await.map_err(|err| {
            warn!(path = %path.display(), error = %err, "run store persist failed");
            StoreError::new(StoreErrorKind::Persist(err.to_string()))
        })
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_run(&self, goal: &str) -> StoreResult<RunId> {
        let id = RunId::new();
        self.state.write().runs.push(RunRecord {
            id: id.clone(),
            goal: goal.to_string(),
            created_at: Utc::now(),
        });
        debug!(run = %id, goal, "run created");
        self.persist().await?;
        Ok(id)
    }

    async fn add_step(
        &self,
        run: &RunId,
        index: usize,
        action: &str,
        observation: &str,
    ) -> StoreResult<()> {
        {
            let mut state = self.state.write();
            state.ensure_run(run)?;
            state.steps.push(StepRecord {
                run_id: run.clone(),
                index,
                action: action.to_string(),
                observation: observation.to_string(),
                created_at: Utc::now(),
            });
        }
        self.persist().await
    }

    async fn add_artifact(&self, run: &RunId, name: &str, payload: &str) -> StoreResult<()> {
        {
            let mut state = self.state.write();
            state.ensure_run(run)?;
            state.artifacts.push(ArtifactRecord {
                run_id: run.clone(),
                name: name.to_string(),
                payload: payload.to_string(),
                created_at: Utc::now(),
            });
        }
        self.persist().await
    }

    async fn recent_context(&self, limit: usize) -> StoreResult<String> {
        let state = self.state.read();
        let goal = state.runs.last().map(|run| run.goal.as_str()).unwrap_or("");
        let skip = state.steps.len().saturating_sub(limit);
        let lines = std::iter::once(format!("Goal: {goal}")).chain(
            state.steps[skip..]
                .iter()
                .map(|step| format!("{} -> {}", step.action, step.observation)),
        );
        Ok(lines.collect::<Vec<_>>().join("\n"))
    }

    async fn run(&self, id: &RunId) -> StoreResult<Option<RunRecord>> {
        Ok(self.state.read().runs.iter().find(|run| &run.id == id).cloned())
    }

    async fn run_log(&self, id: &RunId) -> StoreResult<RunLog> {
        let state = self.state.read();
        state.ensure_run(id)?;
        Ok(RunLog {
            steps: state
                .steps
                .iter()
                .filter(|step| &step.run_id == id)
                .cloned()
                .collect(),
            artifacts: state
                .artifacts
                .iter()
                .filter(|artifact| &artifact.run_id == id)
                .cloned()
                .collect(),
        })
    }
}
