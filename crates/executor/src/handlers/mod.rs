//! Command handlers, grouped by the store they drive.
//!
//! Handlers parse string identifiers, call one substrate method and wrap
//! the result in an [`Output`](crate::Output).

pub mod database;
pub mod experiment;
pub mod trace;

use tracebase_core::{ExperimentId, Result, TraceId};

pub(crate) fn experiment_id(raw: &str) -> Result<ExperimentId> {
    ExperimentId::parse(raw)
}

pub(crate) fn trace_id(raw: &str) -> Result<TraceId> {
    TraceId::parse(raw)
}
