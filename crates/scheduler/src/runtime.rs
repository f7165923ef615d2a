use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use webpilot_core_types::RunId;

use crate::error::RunError;
use crate::model::RunResult;
use crate::orchestrator::Orchestrator;

/// A submitted run. Stopping it never affects other runs.
pub struct RunHandle {
    run_id: RunId,
    cancel: CancellationToken,
    task: JoinHandle<Result<RunResult, RunError>>,
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Requests a stop; honoured before the next step is dispatched.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<RunResult, RunError> {
        self.task
            .await
            .map_err(|err| RunError::Task(err.to_string()))?
    }
}

/// Runs goals on background tasks and tracks which are still running.
pub struct RunManager {
    orchestrator: Arc<Orchestrator>,
    running: Arc<DashMap<RunId, CancellationToken>>,
}

impl RunManager {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Creates the run record, then drives it on a spawned task.
    pub async fn submit(&self, goal: &str) -> Result<RunHandle, RunError> {
        let run_id = self.orchestrator.open_run(goal).await?;
        let cancel = CancellationToken::new();
        self.running.insert(run_id.clone(), cancel.clone());

        let orchestrator = Arc::clone(&self.orchestrator);
        let running = Arc::clone(&self.running);
        let task_run = run_id.clone();
        let task_cancel = cancel.clone();
        let goal = goal.to_string();
        let task = tokio::spawn(async move {
            let result = orchestrator.drive(&task_run, &goal, &task_cancel).await;
            running.remove(&task_run);
            debug!(run = %task_run, "run task exited");
            result
        });
        info!(run = %run_id, "run submitted");
        Ok(RunHandle {
            run_id,
            cancel,
            task,
        })
    }

    pub fn is_running(&self, run_id: &RunId) -> bool {
        self.running.contains_key(run_id)
    }

    pub fn running(&self) -> Vec<RunId> {
        self.running.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Signals one run; returns `false` when it is not running.
    pub fn stop(&self, run_id: &RunId) -> bool {
        match self.running.get(run_id) {
            Some(token) => {
                token.cancel();
                info!(run = %run_id, "stop requested");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for entry in self.running.iter() {
            entry.value().cancel();
            stopped += 1;
        }
        stopped
    }
}
