//! Process-wide component graph.
//!
//! Built once from an [`AppConfig`] and handed to every command; nothing in
//! the workspace reaches for global state instead.

use std::sync::Arc;

use action_flow::ActionExecutor;
use agent_core::{build_planner, SharedPlanner};
use anyhow::{Context, Result};
use browser_pool::ResourcePool;
use cdp_adapter::{ChromiumDriver, StubDriver, StubSite, SurfaceDriver};
use event_store::{InMemoryRunStore, RunStore};
use memory_center::{SelectorMemory, SharedSelectorMemory};
use permissions_broker::{PermissionCheck, PolicyPermissions};
use tracing::info;
use webpilot_policy_center::SecurityGate;
use webpilot_scheduler::{Orchestrator, RunManager};

use crate::config::{AppConfig, DriverKind};

pub struct AppContext {
    config: AppConfig,
    gate: Arc<SecurityGate>,
    permissions: Arc<dyn PermissionCheck>,
    memory: SharedSelectorMemory,
    store: Arc<dyn RunStore>,
    planner: SharedPlanner,
    pool: Arc<ResourcePool>,
    runs: RunManager,
}

impl AppContext {
    /// Wires every component, choosing the surface driver from the config.
    pub async fn build(config: AppConfig) -> Result<Self> {
        let driver: Arc<dyn SurfaceDriver> = match config.browser.driver {
            DriverKind::Chromium => Arc::new(ChromiumDriver::new(config.browser.chromium.clone())),
            DriverKind::Stub => Arc::new(StubDriver::new(StubSite::demo())),
        };
        Self::with_driver(config, driver).await
    }

    pub async fn with_driver(config: AppConfig, driver: Arc<dyn SurfaceDriver>) -> Result<Self> {
        let gate = Arc::new(SecurityGate::new(&config.security));
        let permissions: Arc<dyn PermissionCheck> =
            Arc::new(PolicyPermissions::new(config.permissions.clone()));

        let memory: SharedSelectorMemory = match &config.memory.path {
            Some(path) => Arc::new(
                SelectorMemory::with_persistence(path)
                    .with_context(|| format!("opening selector memory {}", path.display()))?,
            ),
            None => Arc::new(SelectorMemory::new()),
        };

        let store: Arc<dyn RunStore> = match &config.store.path {
            Some(path) => Arc::new(
                InMemoryRunStore::open(path)
                    .await
                    .with_context(|| format!("opening run store {}", path.display()))?,
            ),
            None => Arc::new(InMemoryRunStore::new()),
        };

        let planner = build_planner(&config.planner).context("building planner")?;
        let executor = Arc::new(ActionExecutor::new(
            Arc::clone(&gate),
            Arc::clone(&permissions),
            Arc::clone(&memory),
            &config.executor,
        ));
        let pool = Arc::new(ResourcePool::new(driver, config.pool.clone()));
        let orchestrator = Orchestrator::new(
            Arc::clone(&planner),
            executor,
            Arc::clone(&permissions),
            Arc::clone(&pool),
            Arc::clone(&store),
            config.orchestrator.clone(),
        );
        info!(
            driver = ?config.browser.driver,
            planner = planner.name(),
            allowed = config.security.allowed_domains.len(),
            "application context ready"
        );

        Ok(Self {
            gate,
            permissions,
            memory,
            store,
            planner,
            pool,
            runs: RunManager::new(Arc::new(orchestrator)),
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<SecurityGate> {
        &self.gate
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionCheck> {
        &self.permissions
    }

    pub fn memory(&self) -> &SharedSelectorMemory {
        &self.memory
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    pub fn planner(&self) -> &SharedPlanner {
        &self.planner
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn runs(&self) -> &RunManager {
        &self.runs
    }

    /// Starts the pool; configuration errors surface here.
    pub async fn start(&self) -> Result<()> {
        self.pool.start().await.context("starting resource pool")
    }

    /// Stops the pool and flushes the selector cache.
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.stop().await;
        let memory = self.memory.stats_snapshot();
        info!(
            rate_buckets = self.gate.bucket_count(),
            selector_lookups = memory.total_queries,
            selector_hit_rate = memory.hit_rate,
            selector_records = memory.current_records,
            "application context stopped"
        );
        self.memory
            .persist_now()
            .context("persisting selector memory")?;
        Ok(())
    }
}
