//! Trace primitive.
//!
//! ```ignore
//! let info = db.traces.log(NewTrace::new(exp.clone()).at(ts))?;
//!
//! // Up to 50 of the oldest traces created before `cutoff`
//! let n = db.traces.delete_older_than(&exp, cutoff, Some(50))?;
//!
//! // Exactly these traces; unknown ids are skipped
//! let n = db.traces.delete_ids(&exp, ["tr-1", "tr-2"])?;
//! ```

use std::collections::BTreeMap;

use tracebase_api::{SubstrateImpl, TraceStore};

use crate::{
    BatchPurge, DeleteTracesRequest, ExperimentId, NewTrace, PurgeReport, Result, SearchTraces,
    Span, Trace, TraceId, TraceInfo, TracePage, TraceStatus,
};

/// Trace operations.
///
/// Access via `db.traces`.
#[derive(Debug, Clone)]
pub struct Traces {
    substrate: SubstrateImpl,
}

impl Traces {
    pub(crate) fn new(substrate: SubstrateImpl) -> Self {
        Self { substrate }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Store a finished trace.
    pub fn log(&self, trace: NewTrace) -> Result<TraceInfo> {
        self.substrate.trace_log(trace)
    }

    /// Open an in-progress trace.
    pub fn start(&self, experiment: &ExperimentId) -> Result<TraceInfo> {
        self.substrate
            .trace_start(experiment, BTreeMap::new(), BTreeMap::new())
    }

    /// Close an in-progress trace with its final status and spans.
    pub fn end(&self, id: &TraceId, status: TraceStatus, spans: Vec<Span>) -> Result<TraceInfo> {
        self.substrate.trace_end(id, status, spans, None)
    }

    /// Set a tag.
    pub fn set_tag(&self, id: &TraceId, key: &str, value: &str) -> Result<()> {
        self.substrate.trace_set_tag(id, key, value)
    }

    /// Remove a tag.
    pub fn delete_tag(&self, id: &TraceId, key: &str) -> Result<()> {
        self.substrate.trace_delete_tag(id, key)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Fetch a trace. `None` once deleted.
    pub fn get(&self, id: &TraceId) -> Result<Option<Trace>> {
        self.substrate.trace_get(id)
    }

    /// Number of live traces in an experiment.
    pub fn count(&self, experiment: &ExperimentId) -> Result<u64> {
        self.substrate.trace_count(experiment)
    }

    /// Search trace summaries.
    pub fn search(&self, request: &SearchTraces) -> Result<TracePage> {
        self.substrate.trace_search(request)
    }

    // =========================================================================
    // Deleting
    // =========================================================================

    /// Run a deletion request as is. Returns the number of traces removed.
    pub fn delete(&self, request: &DeleteTracesRequest) -> Result<u64> {
        self.substrate.trace_delete(request)
    }

    /// Delete traces created strictly before `max_timestamp_millis`, oldest
    /// first, at most `max_traces` of them.
    pub fn delete_older_than(
        &self,
        experiment: &ExperimentId,
        max_timestamp_millis: i64,
        max_traces: Option<i64>,
    ) -> Result<u64> {
        let mut request =
            DeleteTracesRequest::older_than(experiment.as_str(), max_timestamp_millis);
        request.max_traces = max_traces;
        self.substrate.trace_delete(&request)
    }

    /// Delete exactly the listed traces. Ids not in the experiment are skipped.
    pub fn delete_ids<I, S>(&self, experiment: &ExperimentId, ids: I) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.substrate
            .trace_delete(&DeleteTracesRequest::by_ids(experiment.as_str(), ids))
    }

    /// Delete everything older than the cutoff in default-sized batches.
    pub fn purge(&self, experiment: &ExperimentId, max_timestamp_millis: i64) -> Result<PurgeReport> {
        BatchPurge::new(experiment.clone(), max_timestamp_millis).run(&self.substrate)
    }

    /// Run a configured purge.
    pub fn purge_with(&self, purge: &BatchPurge) -> Result<PurgeReport> {
        purge.run(&self.substrate)
    }
}
