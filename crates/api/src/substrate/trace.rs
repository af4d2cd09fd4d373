//! TraceStore Substrate Operations
//!
//! A trace records one application/model invocation: a summary
//! ([`TraceInfo`]) plus its spans. Traces are immutable apart from tags and
//! the start/end transition, and are destroyed irreversibly by
//! `trace_delete`.
//!
//! ## Trace Deletion
//!
//! `trace_delete` takes a [`DeleteTracesRequest`] selecting traces either by
//! timestamp cutoff (optionally capped with `max_traces`) or by explicit ids,
//! and returns the number of traces removed. It never retries. Large purges
//! are done in capped batches, see [`BatchPurge`](crate::BatchPurge).

use super::SubstrateImpl;
use crate::search::{self, SearchTraces, TracePage};
use std::collections::BTreeMap;
use tracebase_core::{
    DeleteTracesRequest, ExperimentId, NewTrace, Result, Span, Trace, TraceId, TraceInfo,
    TraceStatus,
};

/// TraceStore substrate operations
///
/// ## Error Handling
///
/// | Condition | Error |
/// |-----------|-------|
/// | Malformed request, duplicate trace id | `InvalidArgument` |
/// | Unknown or deleted experiment, unknown trace/tag | `NotFound` |
/// | Missing permission, read-only database | `PermissionDenied` |
/// | WAL or IO failure | `Service` |
pub trait TraceStore {
    /// Store a finished trace (requires `Edit`)
    fn trace_log(&self, trace: NewTrace) -> Result<TraceInfo>;

    /// Open an in-progress trace stamped now (requires `Edit`)
    fn trace_start(
        &self,
        experiment_id: &ExperimentId,
        request_metadata: BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
    ) -> Result<TraceInfo>;

    /// Close an in-progress trace with a terminal status (requires `Edit`)
    fn trace_end(
        &self,
        trace_id: &TraceId,
        status: TraceStatus,
        spans: Vec<Span>,
        end_time_ms: Option<u64>,
    ) -> Result<TraceInfo>;

    /// Get a trace, `None` when it does not exist (requires `Read`)
    fn trace_get(&self, trace_id: &TraceId) -> Result<Option<Trace>>;

    /// Set a tag on a trace (requires `Edit`)
    fn trace_set_tag(&self, trace_id: &TraceId, key: &str, value: &str) -> Result<()>;

    /// Remove a tag from a trace (requires `Edit`)
    fn trace_delete_tag(&self, trace_id: &TraceId, key: &str) -> Result<()>;

    /// Number of traces in an experiment (requires `Read`)
    fn trace_count(&self, experiment_id: &ExperimentId) -> Result<u64>;

    /// Filter, order and page trace summaries (requires `Read` on every experiment)
    fn trace_search(&self, request: &SearchTraces) -> Result<TracePage>;

    /// Delete traces; returns the number removed (requires `Manage`)
    ///
    /// ## Parameter contract
    ///
    /// | `max_timestamp_millis` | `trace_ids` | `max_traces` | Result |
    /// |---|---|---|---|
    /// | set | absent | absent | all traces older than the cutoff |
    /// | set | absent | set (> 0) | at most `max_traces` oldest traces older than the cutoff |
    /// | absent | set | absent | the listed traces present in the experiment |
    /// | absent | set | set | `InvalidArgument` |
    /// | set | set | any | `InvalidArgument` |
    /// | absent | absent | any | `InvalidArgument` |
    fn trace_delete(&self, request: &DeleteTracesRequest) -> Result<u64>;
}

impl TraceStore for SubstrateImpl {
    fn trace_log(&self, trace: NewTrace) -> Result<TraceInfo> {
        self.database().log_trace(self.principal(), trace)
    }

    fn trace_start(
        &self,
        experiment_id: &ExperimentId,
        request_metadata: BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
    ) -> Result<TraceInfo> {
        self.database()
            .start_trace(self.principal(), experiment_id, request_metadata, tags)
    }

    fn trace_end(
        &self,
        trace_id: &TraceId,
        status: TraceStatus,
        spans: Vec<Span>,
        end_time_ms: Option<u64>,
    ) -> Result<TraceInfo> {
        self.database()
            .end_trace(self.principal(), trace_id, status, spans, end_time_ms)
    }

    fn trace_get(&self, trace_id: &TraceId) -> Result<Option<Trace>> {
        self.database().get_trace(self.principal(), trace_id)
    }

    fn trace_set_tag(&self, trace_id: &TraceId, key: &str, value: &str) -> Result<()> {
        self.database()
            .set_trace_tag(self.principal(), trace_id, key, value)
    }

    fn trace_delete_tag(&self, trace_id: &TraceId, key: &str) -> Result<()> {
        self.database()
            .delete_trace_tag(self.principal(), trace_id, key)
    }

    fn trace_count(&self, experiment_id: &ExperimentId) -> Result<u64> {
        self.database().count_traces(self.principal(), experiment_id)
    }

    fn trace_search(&self, request: &SearchTraces) -> Result<TracePage> {
        let page_size = search::validate(request, self.database().config().max_search_results)?;
        let traces = self
            .database()
            .scan_traces(self.principal(), &request.experiment_ids)?;
        search::run(request, page_size, traces)
    }

    fn trace_delete(&self, request: &DeleteTracesRequest) -> Result<u64> {
        self.database().delete_traces(self.principal(), request)
    }
}
