//! Output enum: every result a command can produce.

use serde::{Deserialize, Serialize};
use tracebase_api::{PurgeReport, TracePage};
use tracebase_core::{Experiment, ExperimentId, Trace, TraceInfo};
use tracebase_engine::DatabaseInfo;

/// Successful command result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No value
    Unit,
    /// Boolean result
    Bool(bool),
    /// Count
    Uint(u64),
    /// Reply to `Ping`
    Pong {
        /// Server crate version
        version: String,
    },
    /// Reply to `Info`
    DatabaseInfo(DatabaseInfo),
    /// Newly created experiment
    ExperimentId(ExperimentId),
    /// One experiment
    Experiment(Experiment),
    /// Optional experiment
    MaybeExperiment(Option<Experiment>),
    /// Experiment listing
    Experiments(Vec<Experiment>),
    /// Trace summary after a write
    TraceInfo(TraceInfo),
    /// Optional full trace
    MaybeTrace(Option<Trace>),
    /// Search results
    TracePage(TracePage),
    /// Number of traces removed by `TraceDelete`
    TracesDeleted(u64),
    /// Result of `TracePurge`
    PurgeReport(PurgeReport),
}

impl Output {
    /// Variant name, for error messages
    pub fn name(&self) -> &'static str {
        match self {
            Output::Unit => "Unit",
            Output::Bool(_) => "Bool",
            Output::Uint(_) => "Uint",
            Output::Pong { .. } => "Pong",
            Output::DatabaseInfo(_) => "DatabaseInfo",
            Output::ExperimentId(_) => "ExperimentId",
            Output::Experiment(_) => "Experiment",
            Output::MaybeExperiment(_) => "MaybeExperiment",
            Output::Experiments(_) => "Experiments",
            Output::TraceInfo(_) => "TraceInfo",
            Output::MaybeTrace(_) => "MaybeTrace",
            Output::TracePage(_) => "TracePage",
            Output::TracesDeleted(_) => "TracesDeleted",
            Output::PurgeReport(_) => "PurgeReport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traces_deleted_json_shape() {
        assert_eq!(
            serde_json::to_string(&Output::TracesDeleted(50)).unwrap(),
            r#"{"TracesDeleted":50}"#
        );
        let back: Output = serde_json::from_str(r#"{"TracesDeleted":50}"#).unwrap();
        assert_eq!(back, Output::TracesDeleted(50));
    }
}
