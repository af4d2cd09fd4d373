//! Command enum: every operation the executor can run.
//!
//! Commands are plain data. They serialize with serde's default externally
//! tagged layout, so the JSON form of a trace deletion is:
//!
//! ```json
//! {"TraceDelete": {"experiment_id": "1", "max_timestamp_millis": 100, "max_traces": 50}}
//! ```
//!
//! Identifiers are carried as strings and validated by the handlers, so a
//! malformed id surfaces as `InvalidArgument` rather than a decode failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracebase_api::SearchTraces;
use tracebase_core::{DeleteTracesRequest, NewTrace, Span, TraceStatus};
use tracebase_security::Permission;

/// A single executable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // ==================== Database ====================
    /// Liveness check
    Ping,
    /// Database counters and settings
    Info,
    /// Force buffered WAL records to disk
    Flush,

    // ==================== Experiments ====================
    /// Create an experiment
    ExperimentCreate {
        name: String,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// Get an experiment by id
    ExperimentGet { experiment_id: String },
    /// Get an experiment by name
    ExperimentGetByName { name: String },
    /// List readable experiments
    ExperimentList {
        #[serde(default)]
        include_deleted: bool,
    },
    /// Soft-delete an experiment
    ExperimentDelete { experiment_id: String },
    /// Restore a soft-deleted experiment
    ExperimentRestore { experiment_id: String },

    // ==================== Permissions ====================
    /// Grant a permission level
    PermissionGrant {
        experiment_id: String,
        principal: String,
        permission: Permission,
    },
    /// Revoke an explicit grant
    PermissionRevoke {
        experiment_id: String,
        principal: String,
    },

    // ==================== Traces ====================
    /// Store a finished trace
    TraceLog(NewTrace),
    /// Open an in-progress trace
    TraceStart {
        experiment_id: String,
        #[serde(default)]
        request_metadata: BTreeMap<String, String>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// Close an in-progress trace
    TraceEnd {
        trace_id: String,
        status: TraceStatus,
        #[serde(default)]
        spans: Vec<Span>,
        #[serde(default)]
        end_time_ms: Option<u64>,
    },
    /// Fetch a trace
    TraceGet { trace_id: String },
    /// Set a trace tag
    TraceSetTag {
        trace_id: String,
        key: String,
        value: String,
    },
    /// Remove a trace tag
    TraceDeleteTag { trace_id: String, key: String },
    /// Count traces in an experiment
    TraceCount { experiment_id: String },
    /// Search trace summaries
    TraceSearch(SearchTraces),
    /// Delete traces by cutoff or by id
    TraceDelete(DeleteTracesRequest),
    /// Delete traces older than a cutoff in capped batches
    TracePurge {
        experiment_id: String,
        max_timestamp_millis: i64,
        #[serde(default)]
        batch_size: Option<u64>,
        #[serde(default)]
        pause_ms: Option<u64>,
    },
}

impl Command {
    /// Variant name, for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "Ping",
            Command::Info => "Info",
            Command::Flush => "Flush",
            Command::ExperimentCreate { .. } => "ExperimentCreate",
            Command::ExperimentGet { .. } => "ExperimentGet",
            Command::ExperimentGetByName { .. } => "ExperimentGetByName",
            Command::ExperimentList { .. } => "ExperimentList",
            Command::ExperimentDelete { .. } => "ExperimentDelete",
            Command::ExperimentRestore { .. } => "ExperimentRestore",
            Command::PermissionGrant { .. } => "PermissionGrant",
            Command::PermissionRevoke { .. } => "PermissionRevoke",
            Command::TraceLog(_) => "TraceLog",
            Command::TraceStart { .. } => "TraceStart",
            Command::TraceEnd { .. } => "TraceEnd",
            Command::TraceGet { .. } => "TraceGet",
            Command::TraceSetTag { .. } => "TraceSetTag",
            Command::TraceDeleteTag { .. } => "TraceDeleteTag",
            Command::TraceCount { .. } => "TraceCount",
            Command::TraceSearch(_) => "TraceSearch",
            Command::TraceDelete(_) => "TraceDelete",
            Command::TracePurge { .. } => "TracePurge",
        }
    }

    /// Whether the command changes state
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Command::Ping
                | Command::Info
                | Command::ExperimentGet { .. }
                | Command::ExperimentGetByName { .. }
                | Command::ExperimentList { .. }
                | Command::TraceGet { .. }
                | Command::TraceCount { .. }
                | Command::TraceSearch(_)
        )
    }
}
