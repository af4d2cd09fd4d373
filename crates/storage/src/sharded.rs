//! Sharded trace storage
//!
//! One shard per experiment, so deletions in one experiment never contend
//! with reads in another.
//!
//! # Design
//!
//! - DashMap: sharded by ExperimentId, lock-free reads
//! - FxHashMap: O(1) trace lookup within a shard
//! - BTreeSet<(timestamp, TraceId)>: ordered index for cutoff selection
//! - Locator: TraceId → ExperimentId for lookups that only know the trace id
//!
//! The store does no validation and no authorization. Callers (the engine)
//! serialize mutations through their commit lock.

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracebase_core::{ExperimentId, Trace, TraceId};

/// Per-experiment shard
#[derive(Debug, Default)]
pub struct Shard {
    /// Traces by id
    pub(crate) traces: FxHashMap<TraceId, Trace>,
    /// Oldest-first index; ties broken by trace id
    pub(crate) by_time: BTreeSet<(u64, TraceId)>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of traces in this shard
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    fn insert(&mut self, trace: Trace) -> Option<Trace> {
        let id = trace.info.trace_id.clone();
        let ts = trace.info.timestamp_ms;
        let previous = self.traces.insert(id.clone(), trace);
        if let Some(prev) = &previous {
            self.by_time.remove(&(prev.info.timestamp_ms, id.clone()));
        }
        self.by_time.insert((ts, id));
        previous
    }

    fn remove(&mut self, id: &TraceId) -> Option<Trace> {
        let trace = self.traces.remove(id)?;
        self.by_time.remove(&(trace.info.timestamp_ms, id.clone()));
        Some(trace)
    }
}

/// Sharded storage - DashMap by ExperimentId, HashMap within
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - get(): lock-free read via DashMap
/// - insert()/remove(): only lock the target experiment's shard
pub struct ShardedStore {
    shards: DashMap<ExperimentId, Shard>,
    locator: DashMap<TraceId, ExperimentId>,
    /// Commit version, bumped once per committed mutation
    version: AtomicU64,
}

impl ShardedStore {
    /// Create new sharded store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
            locator: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Get current version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Set version after a commit or recovery
    pub fn set_version(&self, version: u64) {
        self.version.store(version, Ordering::Release);
    }

    /// Number of experiments holding at least one shard
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total number of traces across all shards
    pub fn total_traces(&self) -> usize {
        self.locator.len()
    }

    /// Number of traces stored for one experiment
    pub fn count(&self, experiment_id: &ExperimentId) -> usize {
        self.shards
            .get(experiment_id)
            .map(|shard| shard.len())
            .unwrap_or(0)
    }

    /// Experiment owning a trace
    pub fn locate(&self, trace_id: &TraceId) -> Option<ExperimentId> {
        self.locator.get(trace_id).map(|e| e.value().clone())
    }

    /// Check if a trace exists
    pub fn contains(&self, trace_id: &TraceId) -> bool {
        self.locator.contains_key(trace_id)
    }

    /// Get a trace by id
    pub fn get(&self, trace_id: &TraceId) -> Option<Trace> {
        let experiment_id = self.locate(trace_id)?;
        self.shards
            .get(&experiment_id)
            .and_then(|shard| shard.traces.get(trace_id).cloned())
    }

    /// Insert or replace a trace
    ///
    /// Returns the replaced trace, if any. A trace id moving to another
    /// experiment is removed from its previous shard first.
    pub fn insert(&self, trace: Trace) -> Option<Trace> {
        let id = trace.info.trace_id.clone();
        let experiment_id = trace.info.experiment_id.clone();

        if let Some(previous_owner) = self.locate(&id) {
            if previous_owner != experiment_id {
                let moved = self
                    .shards
                    .get_mut(&previous_owner)
                    .and_then(|mut shard| shard.remove(&id));
                self.shards
                    .entry(experiment_id.clone())
                    .or_default()
                    .insert(trace);
                self.locator.insert(id, experiment_id);
                return moved;
            }
        }

        let previous = self
            .shards
            .entry(experiment_id.clone())
            .or_default()
            .insert(trace);
        self.locator.insert(id, experiment_id);
        previous
    }

    /// Apply `f` to a stored trace in place
    ///
    /// `f` must not change the trace id, experiment or timestamp.
    pub fn update<R>(&self, trace_id: &TraceId, f: impl FnOnce(&mut Trace) -> R) -> Option<R> {
        let experiment_id = self.locate(trace_id)?;
        let mut shard = self.shards.get_mut(&experiment_id)?;
        let result = shard.traces.get_mut(trace_id).map(f);
        result
    }

    /// Remove one trace
    pub fn remove(&self, trace_id: &TraceId) -> Option<Trace> {
        let (_, experiment_id) = self.locator.remove(trace_id)?;
        self.shards
            .get_mut(&experiment_id)
            .and_then(|mut shard| shard.remove(trace_id))
    }

    /// Remove traces of one experiment, returning how many were removed
    ///
    /// Ids not stored in this experiment are skipped.
    pub fn remove_many(&self, experiment_id: &ExperimentId, trace_ids: &[TraceId]) -> usize {
        let removed: Vec<TraceId> = match self.shards.get_mut(experiment_id) {
            Some(mut shard) => trace_ids
                .iter()
                .filter(|id| shard.remove(id).is_some())
                .cloned()
                .collect(),
            None => return 0,
        };
        for id in &removed {
            self.locator.remove(id);
        }
        tracing::trace!(
            experiment = %experiment_id,
            removed = removed.len(),
            "removed traces from shard"
        );
        removed.len()
    }

    /// Ids of traces created strictly before `cutoff_ms`, oldest first
    ///
    /// Ties on timestamp are broken by trace id. At most `limit` ids are
    /// returned when a limit is given.
    pub fn select_older_than(
        &self,
        experiment_id: &ExperimentId,
        cutoff_ms: u64,
        limit: Option<u64>,
    ) -> Vec<TraceId> {
        let Some(shard) = self.shards.get(experiment_id) else {
            return Vec::new();
        };
        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        shard
            .by_time
            .iter()
            .take_while(|(ts, _)| *ts < cutoff_ms)
            .take(limit)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// The subset of `trace_ids` stored in this experiment, in input order
    pub fn select_existing(
        &self,
        experiment_id: &ExperimentId,
        trace_ids: &[TraceId],
    ) -> Vec<TraceId> {
        let Some(shard) = self.shards.get(experiment_id) else {
            return Vec::new();
        };
        trace_ids
            .iter()
            .filter(|id| shard.traces.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Snapshot of all traces of one experiment, oldest first
    pub fn traces(&self, experiment_id: &ExperimentId) -> Vec<Trace> {
        let Some(shard) = self.shards.get(experiment_id) else {
            return Vec::new();
        };
        shard
            .by_time
            .iter()
            .filter_map(|(_, id)| shard.traces.get(id).cloned())
            .collect()
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}
