#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use action_flow::{ActionExecutor, ExecutorConfig};
use agent_core::{MockPlanner, Planner, PlannerError, SharedPlanner};
use async_trait::async_trait;
use browser_pool::{PoolConfig, ResourcePool};
use cdp_adapter::{StubDriver, StubSite};
use event_store::InMemoryRunStore;
use memory_center::SelectorMemory;
use permissions_broker::{PermissionPolicy, PolicyPermissions};
use webpilot_policy_center::{SecurityGate, SecurityPolicy};
use webpilot_scheduler::{Orchestrator, OrchestratorConfig};

pub struct Harness {
    pub driver: StubDriver,
    pub pool: Arc<ResourcePool>,
    pub store: Arc<InMemoryRunStore>,
}

pub struct Setup {
    pub allowed: Vec<&'static str>,
    pub permissions: PermissionPolicy,
    pub pool: PoolConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            allowed: vec!["example.com"],
            permissions: PermissionPolicy::default(),
            pool: PoolConfig {
                browsers: 1,
                pages_per_browser: 2,
                acquire_timeout_ms: 50,
                max_overflow: 1,
            },
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

pub fn build(setup: Setup, planner: SharedPlanner) -> (Orchestrator, Harness) {
    let driver = StubDriver::new(StubSite::demo());
    let security = SecurityPolicy {
        allowed_domains: setup.allowed.iter().map(|d| d.to_string()).collect(),
        ..SecurityPolicy::default()
    };
    let permissions = Arc::new(PolicyPermissions::new(setup.permissions));
    let executor = Arc::new(ActionExecutor::new(
        Arc::new(SecurityGate::new(&security)),
        permissions.clone(),
        Arc::new(SelectorMemory::new()),
        &ExecutorConfig::default(),
    ));
    let pool = Arc::new(ResourcePool::new(Arc::new(driver.clone()), setup.pool));
    let store = Arc::new(InMemoryRunStore::new());
    let orchestrator = Orchestrator::new(
        planner,
        executor,
        permissions,
        Arc::clone(&pool),
        store.clone(),
        setup.orchestrator,
    );
    (
        orchestrator,
        Harness {
            driver,
            pool,
            store,
        },
    )
}

pub fn mock() -> Arc<MockPlanner> {
    Arc::new(MockPlanner::new())
}

/// Returns its plans in order; the last one repeats.
pub struct ScriptedPlanner {
    plans: Vec<Vec<String>>,
    calls: AtomicUsize,
    reflections: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn new(plans: &[&[&str]]) -> Arc<Self> {
        Arc::new(Self {
            plans: plans
                .iter()
                .map(|plan| plan.iter().map(|step| step.to_string()).collect())
                .collect(),
            calls: AtomicUsize::new(0),
            reflections: AtomicUsize::new(0),
        })
    }

    pub fn reflections(&self) -> usize {
        self.reflections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn analyze(&self, _goal: &str, _context: &str) -> Result<String, PlannerError> {
        Ok("scripted analysis".into())
    }

    async fn plan(&self, _goal: &str, _context: &str) -> Result<Vec<String>, PlannerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.plans.len().saturating_sub(1));
        Ok(self.plans.get(index).cloned().unwrap_or_default())
    }

    async fn reflect(
        &self,
        _last_plan: &[String],
        _observation: &str,
    ) -> Result<String, PlannerError> {
        self.reflections.fetch_add(1, Ordering::SeqCst);
        Ok("try again".into())
    }
}
