//! Trace command handlers.

use std::collections::BTreeMap;
use std::time::Duration;

use tracebase_api::{BatchPurge, SearchTraces, SubstrateImpl, TraceStore, DEFAULT_BATCH_SIZE};
use tracebase_core::{DeleteTracesRequest, NewTrace, Span, TraceStatus};

use super::{experiment_id, trace_id};
use crate::{Output, Result};

/// Handle TraceLog command.
pub fn log(substrate: &SubstrateImpl, trace: NewTrace) -> Result<Output> {
    Ok(Output::TraceInfo(substrate.trace_log(trace)?))
}

/// Handle TraceStart command.
pub fn start(
    substrate: &SubstrateImpl,
    experiment: &str,
    request_metadata: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
) -> Result<Output> {
    let info = substrate.trace_start(&experiment_id(experiment)?, request_metadata, tags)?;
    Ok(Output::TraceInfo(info))
}

/// Handle TraceEnd command.
pub fn end(
    substrate: &SubstrateImpl,
    id: &str,
    status: TraceStatus,
    spans: Vec<Span>,
    end_time_ms: Option<u64>,
) -> Result<Output> {
    let info = substrate.trace_end(&trace_id(id)?, status, spans, end_time_ms)?;
    Ok(Output::TraceInfo(info))
}

/// Handle TraceGet command.
pub fn get(substrate: &SubstrateImpl, id: &str) -> Result<Output> {
    Ok(Output::MaybeTrace(substrate.trace_get(&trace_id(id)?)?))
}

/// Handle TraceSetTag command.
pub fn set_tag(substrate: &SubstrateImpl, id: &str, key: &str, value: &str) -> Result<Output> {
    substrate.trace_set_tag(&trace_id(id)?, key, value)?;
    Ok(Output::Unit)
}

/// Handle TraceDeleteTag command.
pub fn delete_tag(substrate: &SubstrateImpl, id: &str, key: &str) -> Result<Output> {
    substrate.trace_delete_tag(&trace_id(id)?, key)?;
    Ok(Output::Unit)
}

/// Handle TraceCount command.
pub fn count(substrate: &SubstrateImpl, experiment: &str) -> Result<Output> {
    Ok(Output::Uint(substrate.trace_count(&experiment_id(experiment)?)?))
}

/// Handle TraceSearch command.
pub fn search(substrate: &SubstrateImpl, request: &SearchTraces) -> Result<Output> {
    Ok(Output::TracePage(substrate.trace_search(request)?))
}

/// Handle TraceDelete command.
pub fn delete(substrate: &SubstrateImpl, request: &DeleteTracesRequest) -> Result<Output> {
    Ok(Output::TracesDeleted(substrate.trace_delete(request)?))
}

/// Handle TracePurge command.
pub fn purge(
    substrate: &SubstrateImpl,
    experiment: &str,
    max_timestamp_millis: i64,
    batch_size: Option<u64>,
    pause_ms: Option<u64>,
) -> Result<Output> {
    let report = BatchPurge::new(experiment_id(experiment)?, max_timestamp_millis)
        .batch_size(batch_size.unwrap_or(DEFAULT_BATCH_SIZE))
        .pause(Duration::from_millis(pause_ms.unwrap_or(0)))
        .run(substrate)?;
    Ok(Output::PurgeReport(report))
}
