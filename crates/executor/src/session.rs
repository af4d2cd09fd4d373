//! Typed wrapper over the [`Executor`].
//!
//! Each method builds a [`Command`], executes it and unwraps the expected
//! [`Output`] variant.
//!
//! ```ignore
//! let session = Session::new(SubstrateImpl::new(db));
//! let exp = session.experiment_create("checkout-bot")?;
//! let deleted = session.trace_delete(
//!     DeleteTracesRequest::older_than(exp.as_str(), cutoff).with_max_traces(100),
//! )?;
//! ```

use std::collections::BTreeMap;

use tracebase_api::{PurgeReport, SearchTraces, SubstrateImpl, TracePage};
use tracebase_core::{
    DeleteTracesRequest, Experiment, ExperimentId, NewTrace, Span, Trace, TraceInfo, TraceStatus,
};
use tracebase_engine::DatabaseInfo;
use tracebase_security::{Permission, Principal};

use crate::{Command, Error, Executor, Output, Result};

/// Typed access to every command
#[derive(Debug, Clone)]
pub struct Session {
    executor: Executor,
}

fn unexpected(command: &'static str, output: &Output) -> Error {
    Error::UnexpectedOutput {
        command,
        output: output.name(),
    }
}

impl Session {
    /// Create a session over a substrate.
    pub fn new(substrate: SubstrateImpl) -> Self {
        Self {
            executor: Executor::new(substrate),
        }
    }

    /// A session running as `principal` over the same database.
    pub fn as_principal(&self, principal: Principal) -> Self {
        Self::new(self.executor.substrate().as_principal(principal))
    }

    /// The underlying executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    // =========================================================================
    // Database
    // =========================================================================

    /// Ping the database.
    pub fn ping(&self) -> Result<String> {
        match self.executor.execute(Command::Ping)? {
            Output::Pong { version } => Ok(version),
            other => Err(unexpected("Ping", &other)),
        }
    }

    /// Database counters and settings.
    pub fn info(&self) -> Result<DatabaseInfo> {
        match self.executor.execute(Command::Info)? {
            Output::DatabaseInfo(info) => Ok(info),
            other => Err(unexpected("Info", &other)),
        }
    }

    /// Flush buffered WAL records.
    pub fn flush(&self) -> Result<()> {
        match self.executor.execute(Command::Flush)? {
            Output::Unit => Ok(()),
            other => Err(unexpected("Flush", &other)),
        }
    }

    // =========================================================================
    // Experiments
    // =========================================================================

    /// Create an experiment without tags.
    pub fn experiment_create(&self, name: &str) -> Result<ExperimentId> {
        self.experiment_create_with_tags(name, BTreeMap::new())
    }

    /// Create an experiment.
    pub fn experiment_create_with_tags(
        &self,
        name: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<ExperimentId> {
        match self.executor.execute(Command::ExperimentCreate {
            name: name.to_string(),
            tags,
        })? {
            Output::ExperimentId(id) => Ok(id),
            other => Err(unexpected("ExperimentCreate", &other)),
        }
    }

    /// Get an experiment by id.
    pub fn experiment_get(&self, experiment_id: &str) -> Result<Experiment> {
        match self.executor.execute(Command::ExperimentGet {
            experiment_id: experiment_id.to_string(),
        })? {
            Output::Experiment(exp) => Ok(exp),
            other => Err(unexpected("ExperimentGet", &other)),
        }
    }

    /// Get an experiment by name.
    pub fn experiment_get_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        match self.executor.execute(Command::ExperimentGetByName {
            name: name.to_string(),
        })? {
            Output::MaybeExperiment(exp) => Ok(exp),
            other => Err(unexpected("ExperimentGetByName", &other)),
        }
    }

    /// List readable experiments.
    pub fn experiment_list(&self, include_deleted: bool) -> Result<Vec<Experiment>> {
        match self
            .executor
            .execute(Command::ExperimentList { include_deleted })?
        {
            Output::Experiments(list) => Ok(list),
            other => Err(unexpected("ExperimentList", &other)),
        }
    }

    /// Soft-delete an experiment.
    pub fn experiment_delete(&self, experiment_id: &str) -> Result<()> {
        match self.executor.execute(Command::ExperimentDelete {
            experiment_id: experiment_id.to_string(),
        })? {
            Output::Unit => Ok(()),
            other => Err(unexpected("ExperimentDelete", &other)),
        }
    }

    /// Restore a soft-deleted experiment.
    pub fn experiment_restore(&self, experiment_id: &str) -> Result<()> {
        match self.executor.execute(Command::ExperimentRestore {
            experiment_id: experiment_id.to_string(),
        })? {
            Output::Unit => Ok(()),
            other => Err(unexpected("ExperimentRestore", &other)),
        }
    }

    /// Grant `permission` on an experiment.
    pub fn permission_grant(
        &self,
        experiment_id: &str,
        principal: &str,
        permission: Permission,
    ) -> Result<()> {
        match self.executor.execute(Command::PermissionGrant {
            experiment_id: experiment_id.to_string(),
            principal: principal.to_string(),
            permission,
        })? {
            Output::Unit => Ok(()),
            other => Err(unexpected("PermissionGrant", &other)),
        }
    }

    /// Revoke an explicit grant. Returns whether one existed.
    pub fn permission_revoke(&self, experiment_id: &str, principal: &str) -> Result<bool> {
        match self.executor.execute(Command::PermissionRevoke {
            experiment_id: experiment_id.to_string(),
            principal: principal.to_string(),
        })? {
            Output::Bool(existed) => Ok(existed),
            other => Err(unexpected("PermissionRevoke", &other)),
        }
    }

    // =========================================================================
    // Traces
    // =========================================================================

    /// Store a finished trace.
    pub fn trace_log(&self, trace: NewTrace) -> Result<TraceInfo> {
        match self.executor.execute(Command::TraceLog(trace))? {
            Output::TraceInfo(info) => Ok(info),
            other => Err(unexpected("TraceLog", &other)),
        }
    }

    /// Open an in-progress trace.
    pub fn trace_start(&self, experiment_id: &str) -> Result<TraceInfo> {
        match self.executor.execute(Command::TraceStart {
            experiment_id: experiment_id.to_string(),
            request_metadata: BTreeMap::new(),
            tags: BTreeMap::new(),
        })? {
            Output::TraceInfo(info) => Ok(info),
            other => Err(unexpected("TraceStart", &other)),
        }
    }

    /// Close an in-progress trace.
    pub fn trace_end(
        &self,
        trace_id: &str,
        status: TraceStatus,
        spans: Vec<Span>,
    ) -> Result<TraceInfo> {
        match self.executor.execute(Command::TraceEnd {
            trace_id: trace_id.to_string(),
            status,
            spans,
            end_time_ms: None,
        })? {
            Output::TraceInfo(info) => Ok(info),
            other => Err(unexpected("TraceEnd", &other)),
        }
    }

    /// Fetch a trace.
    pub fn trace_get(&self, trace_id: &str) -> Result<Option<Trace>> {
        match self.executor.execute(Command::TraceGet {
            trace_id: trace_id.to_string(),
        })? {
            Output::MaybeTrace(trace) => Ok(trace),
            other => Err(unexpected("TraceGet", &other)),
        }
    }

    /// Set a trace tag.
    pub fn trace_set_tag(&self, trace_id: &str, key: &str, value: &str) -> Result<()> {
        match self.executor.execute(Command::TraceSetTag {
            trace_id: trace_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })? {
            Output::Unit => Ok(()),
            other => Err(unexpected("TraceSetTag", &other)),
        }
    }

    /// Remove a trace tag.
    pub fn trace_delete_tag(&self, trace_id: &str, key: &str) -> Result<()> {
        match self.executor.execute(Command::TraceDeleteTag {
            trace_id: trace_id.to_string(),
            key: key.to_string(),
        })? {
            Output::Unit => Ok(()),
            other => Err(unexpected("TraceDeleteTag", &other)),
        }
    }

    /// Count traces in an experiment.
    pub fn trace_count(&self, experiment_id: &str) -> Result<u64> {
        match self.executor.execute(Command::TraceCount {
            experiment_id: experiment_id.to_string(),
        })? {
            Output::Uint(n) => Ok(n),
            other => Err(unexpected("TraceCount", &other)),
        }
    }

    /// Search trace summaries.
    pub fn trace_search(&self, request: SearchTraces) -> Result<TracePage> {
        match self.executor.execute(Command::TraceSearch(request))? {
            Output::TracePage(page) => Ok(page),
            other => Err(unexpected("TraceSearch", &other)),
        }
    }

    /// Delete traces. Returns how many were removed.
    pub fn trace_delete(&self, request: DeleteTracesRequest) -> Result<u64> {
        match self.executor.execute(Command::TraceDelete(request))? {
            Output::TracesDeleted(n) => Ok(n),
            other => Err(unexpected("TraceDelete", &other)),
        }
    }

    /// Delete everything older than a cutoff in batches.
    pub fn trace_purge(
        &self,
        experiment_id: &str,
        max_timestamp_millis: i64,
        batch_size: Option<u64>,
    ) -> Result<PurgeReport> {
        match self.executor.execute(Command::TracePurge {
            experiment_id: experiment_id.to_string(),
            max_timestamp_millis,
            batch_size,
            pause_ms: None,
        })? {
            Output::PurgeReport(report) => Ok(report),
            other => Err(unexpected("TracePurge", &other)),
        }
    }
}
