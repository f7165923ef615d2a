use std::path::Path;
use std::sync::Arc;

use action_flow::{ActionExecutor, ExecError};
use agent_core::{interpret_loose, LooseStep, Role, SharedPlanner};
use browser_pool::ResourcePool;
use cdp_adapter::PageSurface;
use event_store::RunStore;
use permissions_broker::{PermissionCheck, PermissionKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use webpilot_core_types::{parse_action, RunId};

use crate::error::RunError;
use crate::model::{OrchestratorConfig, RunOutcome, RunResult, RunState};
use crate::validator::{KeywordValidator, ObservationValidator};

/// Drives one goal through plan, execute, validate and replan.
///
/// Steps of a run execute strictly in order on a single leased surface. The
/// cancellation token is consulted before every step dispatch; an action
/// already in flight always finishes.
pub struct Orchestrator {
    planner: SharedPlanner,
    executor: Arc<ActionExecutor>,
    permissions: Arc<dyn PermissionCheck>,
    pool: Arc<ResourcePool>,
    store: Arc<dyn RunStore>,
    validator: Arc<dyn ObservationValidator>,
    cfg: OrchestratorConfig,
}

/// Mutable bookkeeping of one run.
struct Progress {
    plan: Vec<String>,
    observations: Vec<String>,
    analysis: Option<String>,
    replans: u32,
    logged: usize,
}

impl Orchestrator {
    pub fn new(
        planner: SharedPlanner,
        executor: Arc<ActionExecutor>,
        permissions: Arc<dyn PermissionCheck>,
        pool: Arc<ResourcePool>,
        store: Arc<dyn RunStore>,
        cfg: OrchestratorConfig,
    ) -> Self {
        Self {
            planner,
            executor,
            permissions,
            pool,
            store,
            validator: Arc::new(KeywordValidator::default()),
            cfg,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ObservationValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Creates the run record and drives it to a terminal state.
    pub async fn run(&self, goal: &str, cancel: &CancellationToken) -> Result<RunResult, RunError> {
        let run_id = self.open_run(goal).await?;
        self.drive(&run_id, goal, cancel).await
    }

    pub async fn open_run(&self, goal: &str) -> Result<RunId, RunError> {
        let run_id = self.store.create_run(goal).await?;
        info!(run = %run_id, goal, "run created");
        Ok(run_id)
    }

    /// Runs an already created run. Store failures are returned as errors;
    /// planner and pool failures end the run as `Failed`.
    pub async fn drive(
        &self,
        run_id: &RunId,
        goal: &str,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunError> {
        let mut progress = Progress {
            plan: Vec::new(),
            observations: Vec::new(),
            analysis: None,
            replans: 0,
            logged: 0,
        };
        let (outcome, failure) = match self.control_loop(run_id, goal, cancel, &mut progress).await
        {
            Ok(outcome) => (outcome, None),
            Err(err) if err.is_fatal() => {
                error!(run = %run_id, error = %err, "run failed");
                (RunOutcome::Failed, Some(err.to_string()))
            }
            Err(err) => return Err(err),
        };

        let tail = progress
            .observations
            .len()
            .saturating_sub(self.cfg.summary_tail);
        let summary = progress.observations[tail..].join("\n");
        self.store
            .add_artifact(run_id, "summary.txt", &summary)
            .await?;
        info!(
            run = %run_id,
            outcome = %outcome,
            steps = progress.logged,
            replans = progress.replans,
            "run finished"
        );
        Ok(RunResult {
            run_id: run_id.clone(),
            goal: goal.to_string(),
            outcome,
            analysis: progress.analysis,
            plan: progress.plan,
            observations: progress.observations,
            replans: progress.replans,
            summary,
            error: failure,
        })
    }

    async fn control_loop(
        &self,
        run_id: &RunId,
        goal: &str,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<RunOutcome, RunError> {
        debug!(run = %run_id, state = ?RunState::Planning, "control loop entered");
        let context = self.store.recent_context(self.cfg.context_limit).await?;
        let analysis = self.planner.analyze(goal, &context).await?;
        self.store
            .add_artifact(run_id, "analysis.txt", &analysis)
            .await?;
        progress.analysis = Some(analysis);
        progress.plan = self.planner.plan(goal, &context).await?;
        info!(
            run = %run_id,
            planner = self.planner.name(),
            steps = progress.plan.len(),
            "plan ready"
        );

        let lease = self.pool.acquire_default().await?;
        debug!(run = %run_id, handle = %lease.handle_id(), "surface leased");
        let surface = Arc::clone(lease.surface());

        let mut state = RunState::Executing(0);
        let result = loop {
            if let Some(outcome) = state.outcome() {
                break Ok(outcome);
            }
            state = match state {
                RunState::Executing(index) => {
                    if index >= progress.plan.len() {
                        RunState::Completed
                    } else if cancel.is_cancelled() {
                        info!(run = %run_id, step = index, "stop signal seen, aborting");
                        RunState::Aborted
                    } else {
                        match self
                            .run_step(run_id, surface.as_ref(), index, progress)
                            .await
                        {
                            Ok(next) => next,
                            Err(err) => break Err(err),
                        }
                    }
                }
                RunState::Validating { index, observation } => {
                    let verdict = self.validator.validate(&observation);
                    if verdict.passed {
                        RunState::Executing(index + 1)
                    } else {
                        warn!(run = %run_id, reason = %verdict.reason, "observation rejected");
                        let dom = self.snapshot(surface.as_ref()).await;
                        RunState::Replanning {
                            failure: format!("Validation failed: {observation}\nDOM: {dom}"),
                        }
                    }
                }
                RunState::Replanning { failure } => {
                    if progress.replans >= self.cfg.max_replans {
                        warn!(run = %run_id, replans = progress.replans, "replan bound reached");
                        RunState::Exhausted
                    } else {
                        match self.replan(goal, &failure, progress).await {
                            Ok(()) => RunState::Executing(0),
                            Err(err) => break Err(err),
                        }
                    }
                }
                other => other,
            };
        };

        self.pool.release(lease).await;
        result
    }

    async fn run_step(
        &self,
        run_id: &RunId,
        surface: &dyn PageSurface,
        index: usize,
        progress: &mut Progress,
    ) -> Result<RunState, RunError> {
        let step = progress.plan[index].clone();
        let role = Role::classify(&step);
        progress.logged += 1;
        let position = progress.logged;
        debug!(run = %run_id, step = %step, role = %role, "dispatching step");

        match self.dispatch(surface, role, &step).await {
            Ok(observation) => {
                self.capture(surface, position, role).await;
                progress.observations.push(observation.clone());
                self.store
                    .add_step(run_id, position, &format!("{role}:{step}"), &observation)
                    .await?;
                Ok(RunState::Validating { index, observation })
            }
            Err(err) => {
                error!(run = %run_id, role = %role, error = %err, "step failed");
                let dom = self.snapshot(surface).await;
                let failure = format!("Error: {err}\nDOM: {dom}");
                progress.observations.push(failure.clone());
                self.store
                    .add_step(run_id, position, &format!("{role}:{step}"), &failure)
                    .await?;
                Ok(RunState::Replanning { failure })
            }
        }
    }

    async fn dispatch(
        &self,
        surface: &dyn PageSurface,
        role: Role,
        step: &str,
    ) -> Result<String, ExecError> {
        if role == Role::Login && !self.permissions.check(PermissionKind::Login.as_str()) {
            return Err(ExecError::NotPermitted(PermissionKind::Login.to_string()));
        }
        if !self.cfg.loose_steps || parse_action(step).is_some() {
            return self.executor.execute_step(surface, step).await;
        }
        match interpret_loose(step) {
            LooseStep::Act(action) => self.executor.execute(surface, &action).await,
            LooseStep::Search { query, action } => {
                self.executor.execute(surface, &action).await?;
                Ok(format!("searched:{query}"))
            }
            LooseStep::Noop(reason) => Ok(format!("noop:{reason}")),
        }
    }

    async fn replan(
        &self,
        goal: &str,
        failure: &str,
        progress: &mut Progress,
    ) -> Result<(), RunError> {
        let context = self.store.recent_context(self.cfg.context_limit).await?;
        let plan = self
            .planner
            .replan(goal, &context, &progress.plan, failure)
            .await?;
        progress.replans += 1;
        info!(replans = progress.replans, steps = plan.len(), "plan replaced");
        progress.plan = plan;
        Ok(())
    }

    /// Page content cut to the configured bound; empty when unreadable.
    async fn snapshot(&self, surface: &dyn PageSurface) -> String {
        match surface.content().await {
            Ok(html) => html.chars().take(self.cfg.snapshot_chars).collect(),
            Err(err) => {
                debug!(error = %err, "page snapshot unavailable");
                String::new()
            }
        }
    }

    async fn capture(&self, surface: &dyn PageSurface, position: usize, role: Role) {
        let Some(dir) = self.cfg.screenshots_dir.as_deref() else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %err, "cannot create screenshot dir");
            return;
        }
        let path = screenshot_path(dir, position, role);
        if let Err(err) = surface.screenshot(&path).await {
            warn!(path = %path.display(), error = %err, "screenshot failed");
        }
    }
}

fn screenshot_path(dir: &Path, position: usize, role: Role) -> std::path::PathBuf {
    dir.join(format!("step_{position}_{role}.png"))
}
