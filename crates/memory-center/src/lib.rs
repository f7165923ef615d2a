//! Selector memory: (origin, action kind, label) to descriptors that worked before.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use webpilot_core_types::ActionKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRecord {
    pub origin: String,
    pub action: String,
    pub label: String,
    pub descriptor: String,
    pub success_count: u64,
    pub updated_at: DateTime<Utc>,
    /// Write order, breaks timestamp ties.
    #[serde(default)]
    pub revision: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SelectorKey {
    origin: String,
    action: String,
    label: String,
}

impl SelectorKey {
    fn new(origin: &str, action: &str, label: &str) -> Self {
        Self {
            origin: origin.to_string(),
            action: action.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Default)]
pub struct SelectorMemory {
    inner: DashMap<SelectorKey, Vec<SelectorRecord>>,
    storage_path: Option<PathBuf>,
    revision: AtomicU64,
    persist_lock: Mutex<()>,
    metrics: MemoryMetrics,
}

#[derive(Default)]
struct MemoryMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    upserts: AtomicU64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStatsSnapshot {
    pub total_queries: u64,
    pub hit_queries: u64,
    pub miss_queries: u64,
    pub hit_rate: f64,
    pub upserts: u64,
    pub current_records: u64,
}

impl SelectorMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads existing records from `path` and writes back after every upsert.
    pub fn with_persistence(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let memory = Self {
            storage_path: Some(path.clone()),
            ..Self::default()
        };

        if path.exists() {
            let bytes = fs::read(&path)?;
            if !bytes.is_empty() {
                let records: Vec<SelectorRecord> = serde_json::from_slice(&bytes)
                    .map_err(|err| io::Error::new(ErrorKind::InvalidData, format!("{err}")))?;
                let mut max_revision = 0;
                for record in records {
                    max_revision = max_revision.max(record.revision);
                    memory
                        .inner
                        .entry(SelectorKey::new(&record.origin, &record.action, &record.label))
                        .or_default()
                        .push(record);
                }
                memory.revision.store(max_revision, Ordering::SeqCst);
            }
        }

        Ok(memory)
    }

    /// Descriptors ordered by success count, then most recently updated.
    pub fn lookup(&self, origin: &str, action: ActionKind, label: &str) -> Vec<String> {
        self.lookup_records(origin, action, label)
            .into_iter()
            .map(|record| record.descriptor)
            .collect()
    }

    pub fn lookup_records(
        &self,
        origin: &str,
        action: ActionKind,
        label: &str,
    ) -> Vec<SelectorRecord> {
        let key = SelectorKey::new(origin, action.as_str(), label);
        let mut records = self
            .inner
            .get(&key)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        self.metrics.record_lookup(!records.is_empty());
        sort_ranked(&mut records);
        records
    }

    /// Increment-or-insert under the key's entry lock.
    pub fn record_success(
        &self,
        origin: &str,
        action: ActionKind,
        label: &str,
        descriptor: &str,
    ) -> SelectorRecord {
        let key = SelectorKey::new(origin, action.as_str(), label);
        let updated = {
            let mut entry = self.inner.entry(key).or_default();
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            let now = Utc::now();
            match entry.iter_mut().find(|record| record.descriptor == descriptor) {
                Some(record) => {
                    record.success_count = record.success_count.saturating_add(1);
                    record.updated_at = now;
                    record.revision = revision;
                    record.clone()
                }
                None => {
                    let record = SelectorRecord {
                        origin: origin.to_string(),
                        action: action.as_str().to_string(),
                        label: label.to_string(),
                        descriptor: descriptor.to_string(),
                        success_count: 1,
                        updated_at: now,
                        revision,
                    };
                    entry.push(record.clone());
                    record
                }
            }
        };
        self.metrics.upserts.fetch_add(1, Ordering::Relaxed);
        debug!(
            origin,
            action = action.as_str(),
            label,
            descriptor,
            count = updated.success_count,
            "selector success recorded"
        );
        if let Err(err) = self.persist_to_disk() {
            warn!(error = %err, "selector memory persist failed after upsert");
        }
        updated
    }

    /// Records filtered by origin and optionally by action and label, ranked.
    pub fn list(
        &self,
        origin: Option<&str>,
        action: Option<&str>,
        label: Option<&str>,
    ) -> Vec<SelectorRecord> {
        let mut records: Vec<SelectorRecord> = self
            .inner
            .iter()
            .filter(|entry| {
                let key = entry.key();
                origin.map_or(true, |o| key.origin == o)
                    && action.map_or(true, |a| key.action.eq_ignore_ascii_case(a))
                    && label.map_or(true, |l| key.label == l)
            })
            .flat_map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            (&a.origin, &a.action, &a.label)
                .cmp(&(&b.origin, &b.action, &b.label))
                .then_with(|| rank_order(a, b))
        });
        records
    }

    pub fn persist_now(&self) -> io::Result<()> {
        self.persist_to_disk()
    }

    pub fn stats_snapshot(&self) -> MemoryStatsSnapshot {
        let total_queries = self.metrics.lookups.load(Ordering::Relaxed);
        let hit_queries = self.metrics.hits.load(Ordering::Relaxed);
        let miss_queries = self.metrics.misses.load(Ordering::Relaxed);
        let hit_rate = if total_queries == 0 {
            0.0
        } else {
            hit_queries as f64 / total_queries as f64
        };
        MemoryStatsSnapshot {
            total_queries,
            hit_queries,
            miss_queries,
            hit_rate,
            upserts: self.metrics.upserts.load(Ordering::Relaxed),
            current_records: self.inner.iter().map(|entry| entry.value().len() as u64).sum(),
        }
    }

    fn persist_to_disk(&self) -> io::Result<()> {
        let Some(path) = self.storage_path.as_ref() else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut all_records: Vec<SelectorRecord> = Vec::new();
        for entry in self.inner.iter() {
            all_records.extend(entry.value().clone());
        }
        all_records.sort_by_key(|record| record.revision);
        let json = serde_json::to_vec_pretty(&all_records)
            .map_err(|err| io::Error::new(ErrorKind::Other, format!("{err}")))?;
        fs::write(path, json)
    }
}

pub type SharedSelectorMemory = Arc<SelectorMemory>;

fn rank_order(a: &SelectorRecord, b: &SelectorRecord) -> std::cmp::Ordering {
    b.success_count
        .cmp(&a.success_count)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| b.revision.cmp(&a.revision))
}

fn sort_ranked(records: &mut [SelectorRecord]) {
    records.sort_by(rank_order);
}

impl MemoryMetrics {
    fn record_lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";

    #[test]
    fn miss_is_empty() {
        let memory = SelectorMemory::new();
        assert!(memory.lookup(ORIGIN, ActionKind::Click, "Login").is_empty());
        assert_eq!(memory.stats_snapshot().miss_queries, 1);
    }

    #[test]
    fn upsert_increments_existing_and_inserts_new() {
        let memory = SelectorMemory::new();
        let first = memory.record_success(ORIGIN, ActionKind::Click, "Login", "#login");
        assert_eq!(first.success_count, 1);
        let second = memory.record_success(ORIGIN, ActionKind::Click, "Login", "#login");
        assert_eq!(second.success_count, 2);
        assert!(second.updated_at >= first.updated_at);
        assert!(second.revision > first.revision);

        let other = memory.record_success(ORIGIN, ActionKind::Click, "Login", "text=Login");
        assert_eq!(other.success_count, 1);
        assert_eq!(memory.stats_snapshot().current_records, 2);
    }

    #[test]
    fn lookup_ranks_by_count_then_recency() {
        let memory = SelectorMemory::new();
        memory.record_success(ORIGIN, ActionKind::Type, "Email", "placeholder=Email");
        memory.record_success(ORIGIN, ActionKind::Type, "Email", "#email");
        memory.record_success(ORIGIN, ActionKind::Type, "Email", "#email");
        memory.record_success(ORIGIN, ActionKind::Type, "Email", "label=Email");

        assert_eq!(
            memory.lookup(ORIGIN, ActionKind::Type, "Email"),
            vec!["#email", "label=Email", "placeholder=Email"]
        );
        // Kind and origin are part of the key.
        assert!(memory.lookup(ORIGIN, ActionKind::Click, "Email").is_empty());
        assert!(memory
            .lookup("https://other.com", ActionKind::Type, "Email")
            .is_empty());
    }

    #[test]
    fn list_filters_by_origin_and_action() {
        let memory = SelectorMemory::new();
        memory.record_success(ORIGIN, ActionKind::Click, "Go", "#go");
        memory.record_success(ORIGIN, ActionKind::Type, "Q", "#q");
        memory.record_success("https://b.test", ActionKind::Click, "Go", "#go");
        assert_eq!(memory.list(Some(ORIGIN), None, None).len(), 2);
        assert_eq!(memory.list(Some(ORIGIN), Some("click"), None).len(), 1);
        assert_eq!(memory.list(None, None, Some("Go")).len(), 2);
    }

    #[test]
    fn persistence_round_trips_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selectors.json");
        {
            let memory = SelectorMemory::with_persistence(&path).unwrap();
            memory.record_success(ORIGIN, ActionKind::Click, "Go", "#go");
            memory.record_success(ORIGIN, ActionKind::Click, "Go", "#go");
        }
        let reloaded = SelectorMemory::with_persistence(&path).unwrap();
        let records = reloaded.lookup_records(ORIGIN, ActionKind::Click, "Go");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].success_count, 2);
        let next = reloaded.record_success(ORIGIN, ActionKind::Click, "Go", "text=Go");
        assert!(next.revision > records[0].revision);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_upserts_never_lose_increments() {
        let memory = Arc::new(SelectorMemory::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let memory = Arc::clone(&memory);
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    memory.record_success(ORIGIN, ActionKind::Click, "Submit", "#submit");
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let records = memory.lookup_records(ORIGIN, ActionKind::Click, "Submit");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].success_count, 800);
    }
}
