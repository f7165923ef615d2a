use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use cdp_adapter::{BrowserSlot, SharedSurface, SurfaceDriver};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};
use webpilot_core_types::HandleId;

use crate::errors::PoolError;
use crate::model::{PoolConfig, PoolStats};

struct Slot {
    index: usize,
    browser: Arc<dyn BrowserSlot>,
    idle: Mutex<VecDeque<SharedSurface>>,
    capacity: usize,
    retired: AtomicBool,
}

enum LeaseOrigin {
    Pooled(Weak<Slot>),
    Overflow,
}

struct PoolInner {
    driver: Arc<dyn SurfaceDriver>,
    cfg: PoolConfig,
    slots: RwLock<Vec<Arc<Slot>>>,
    started: AtomicBool,
    lifecycle: AsyncMutex<()>,
    overflow_lock: AsyncMutex<()>,
    overflow_live: AtomicUsize,
    outstanding: AtomicUsize,
    cursor: AtomicUsize,
    available: Notify,
}

impl PoolInner {
    fn snapshot(&self) -> Vec<Arc<Slot>> {
        self.slots.read().clone()
    }

    /// Round-robin pop of the first idle handle.
    fn try_pop(self: &Arc<Self>) -> Option<Lease> {
        let slots = self.snapshot();
        if slots.is_empty() {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..slots.len() {
            let slot = &slots[(start + offset) % slots.len()];
            let popped = slot.idle.lock().pop_front();
            if let Some(surface) = popped {
                self.outstanding.fetch_add(1, Ordering::SeqCst);
                return Some(Lease {
                    surface,
                    slot_index: slot.index,
                    origin: LeaseOrigin::Pooled(Arc::downgrade(slot)),
                    inner: Arc::clone(self),
                    settled: false,
                });
            }
        }
        None
    }

    /// Books the lease back in. Returns the surface when it must be closed instead.
    fn settle(&self, origin: &LeaseOrigin, surface: &SharedSurface) -> Option<SharedSurface> {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        match origin {
            LeaseOrigin::Overflow => {
                self.overflow_live.fetch_sub(1, Ordering::SeqCst);
                Some(Arc::clone(surface))
            }
            LeaseOrigin::Pooled(slot) => {
                let Some(slot) = slot.upgrade() else {
                    return Some(Arc::clone(surface));
                };
                if slot.retired.load(Ordering::SeqCst) {
                    return Some(Arc::clone(surface));
                }
                let mut idle = slot.idle.lock();
                if idle.len() >= slot.capacity {
                    return Some(Arc::clone(surface));
                }
                idle.push_back(Arc::clone(surface));
                drop(idle);
                self.available.notify_one();
                None
            }
        }
    }
}

/// A leased page surface. Hand it back with [`ResourcePool::release`].
pub struct Lease {
    surface: SharedSurface,
    slot_index: usize,
    origin: LeaseOrigin,
    inner: Arc<PoolInner>,
    settled: bool,
}

impl Lease {
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn handle_id(&self) -> &HandleId {
        self.surface.id()
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self.origin, LeaseOrigin::Overflow)
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("handle", self.surface.id())
            .field("slot", &self.slot_index)
            .field("overflow", &self.is_overflow())
            .finish()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        warn!(handle = %self.surface.id(), "lease dropped without release");
        if let Some(surface) = self.inner.settle(&self.origin, &self.surface) {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(err) = surface.close().await {
                        debug!(error = %err, "closing dropped lease failed");
                    }
                });
            }
        }
    }
}

/// Bounded pool of pre-warmed surfaces spread over browser slots.
#[derive(Clone)]
pub struct ResourcePool {
    inner: Arc<PoolInner>,
}

impl ResourcePool {
    pub fn new(driver: Arc<dyn SurfaceDriver>, cfg: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                driver,
                cfg,
                slots: RwLock::new(Vec::new()),
                started: AtomicBool::new(false),
                lifecycle: AsyncMutex::new(()),
                overflow_lock: AsyncMutex::new(()),
                overflow_live: AtomicUsize::new(0),
                outstanding: AtomicUsize::new(0),
                cursor: AtomicUsize::new(0),
                available: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.cfg
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Launches every slot and pre-opens its surfaces. Repeated calls are no-ops.
    pub async fn start(&self) -> Result<(), PoolError> {
        if self.is_started() {
            return Ok(());
        }
        let _guard = self.inner.lifecycle.lock().await;
        if self.is_started() {
            return Ok(());
        }
        let cfg = &self.inner.cfg;
        if cfg.browsers == 0 {
            return Err(PoolError::Config("at least one browser is required".into()));
        }

        let mut slots: Vec<Arc<Slot>> = Vec::with_capacity(cfg.browsers);
        for index in 0..cfg.browsers {
            match self.launch_slot(index).await {
                Ok(slot) => slots.push(slot),
                Err(err) => {
                    for slot in slots {
                        shutdown_slot(&slot).await;
                    }
                    return Err(err);
                }
            }
        }
        *self.inner.slots.write() = slots;
        self.inner.started.store(true, Ordering::SeqCst);
        info!(
            browsers = cfg.browsers,
            pages_per_browser = cfg.pages_per_browser,
            "resource pool started"
        );
        Ok(())
    }

    async fn launch_slot(&self, index: usize) -> Result<Arc<Slot>, PoolError> {
        let browser = self
            .inner
            .driver
            .launch(index)
            .await
            .map_err(PoolError::Launch)?;
        let capacity = self.inner.cfg.pages_per_browser;
        let mut idle = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            match browser.open_surface().await {
                Ok(surface) => idle.push_back(surface),
                Err(err) => {
                    for surface in idle {
                        close_quietly(&surface).await;
                    }
                    if let Err(shutdown_err) = browser.shutdown().await {
                        debug!(slot = index, error = %shutdown_err, "slot shutdown after failed warmup");
                    }
                    return Err(PoolError::Launch(err));
                }
            }
        }
        Ok(Arc::new(Slot {
            index,
            browser,
            idle: Mutex::new(idle),
            capacity,
            retired: AtomicBool::new(false),
        }))
    }

    /// Closes every idle surface and shuts each slot down. Safe before `start`.
    pub async fn stop(&self) {
        let _guard = self.inner.lifecycle.lock().await;
        if !self.inner.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let slots = std::mem::take(&mut *self.inner.slots.write());
        for slot in slots {
            shutdown_slot(&slot).await;
        }
        info!("resource pool stopped");
    }

    /// Pops an idle surface, waiting up to `wait`; falls back to a temporary overflow surface.
    pub async fn acquire(&self, wait: Duration) -> Result<Lease, PoolError> {
        self.start().await?;
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.inner.available.notified();
            if let Some(lease) = self.inner.try_pop() {
                return Ok(lease);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if timeout(deadline - now, notified).await.is_err() {
                break;
            }
        }
        self.acquire_overflow().await
    }

    pub async fn acquire_default(&self) -> Result<Lease, PoolError> {
        self.acquire(self.inner.cfg.acquire_timeout()).await
    }

    async fn acquire_overflow(&self) -> Result<Lease, PoolError> {
        let _guard = self.inner.overflow_lock.lock().await;
        if let Some(lease) = self.inner.try_pop() {
            return Ok(lease);
        }
        let live = self.inner.overflow_live.load(Ordering::SeqCst);
        if live >= self.inner.cfg.max_overflow {
            warn!(live, "overflow limit reached");
            return Err(PoolError::Exhausted(format!(
                "all {} pooled handles leased and overflow limit {} reached",
                self.inner.cfg.capacity(),
                self.inner.cfg.max_overflow
            )));
        }
        let first = self
            .inner
            .snapshot()
            .into_iter()
            .next()
            .ok_or_else(|| PoolError::Exhausted("no browsers available".into()))?;
        let surface = first.browser.open_surface().await.map_err(|err| {
            PoolError::Exhausted(format!("overflow handle creation failed: {err}"))
        })?;
        self.inner.overflow_live.fetch_add(1, Ordering::SeqCst);
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        info!(handle = %surface.id(), "overflow handle created");
        Ok(Lease {
            surface,
            slot_index: first.index,
            origin: LeaseOrigin::Overflow,
            inner: Arc::clone(&self.inner),
            settled: false,
        })
    }

    /// Returns the surface to its slot, or closes it when that is impossible.
    pub async fn release(&self, mut lease: Lease) {
        lease.settled = true;
        if let Some(surface) = lease.inner.settle(&lease.origin, &lease.surface) {
            debug!(handle = %surface.id(), "closing surface on release");
            close_quietly(&surface).await;
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.inner.snapshot();
        PoolStats {
            started: self.is_started(),
            slots: slots.len(),
            idle: slots.iter().map(|slot| slot.idle.lock().len()).sum(),
            outstanding: self.outstanding(),
            overflow_live: self.inner.overflow_live.load(Ordering::SeqCst),
        }
    }
}

async fn close_quietly(surface: &SharedSurface) {
    if let Err(err) = surface.close().await {
        debug!(handle = %surface.id(), error = %err, "surface close failed");
    }
}

async fn shutdown_slot(slot: &Slot) {
    slot.retired.store(true, Ordering::SeqCst);
    let drained: Vec<SharedSurface> = slot.idle.lock().drain(..).collect();
    for surface in drained {
        close_quietly(&surface).await;
    }
    if let Err(err) = slot.browser.shutdown().await {
        warn!(slot = slot.index, error = %err, "slot shutdown failed");
    }
}
