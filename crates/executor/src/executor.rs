//! The executor: one entry point that runs any [`Command`].

use tracebase_api::SubstrateImpl;
use tracebase_security::Principal;
use tracing::debug;

use crate::handlers::{database, experiment, trace};
use crate::{Command, Output, Result};

/// Dispatches commands to the substrate
///
/// Every command runs as the principal the underlying [`SubstrateImpl`] is
/// bound to. [`Executor::execute_as`] runs a single command as someone else.
#[derive(Debug, Clone)]
pub struct Executor {
    substrate: SubstrateImpl,
}

impl Executor {
    /// Create an executor over a substrate.
    pub fn new(substrate: SubstrateImpl) -> Self {
        Self { substrate }
    }

    /// The substrate commands run against.
    pub fn substrate(&self) -> &SubstrateImpl {
        &self.substrate
    }

    /// Execute a command as the substrate's principal.
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        dispatch(&self.substrate, cmd)
    }

    /// Execute a command as `principal`.
    pub fn execute_as(&self, principal: Principal, cmd: Command) -> Result<Output> {
        dispatch(&self.substrate.as_principal(principal), cmd)
    }

    /// Execute commands in order, stopping at nothing.
    ///
    /// Each command gets its own result; a failure does not undo or skip the
    /// commands around it.
    pub fn execute_many(&self, cmds: Vec<Command>) -> Vec<Result<Output>> {
        cmds.into_iter().map(|cmd| self.execute(cmd)).collect()
    }
}

fn dispatch(s: &SubstrateImpl, cmd: Command) -> Result<Output> {
    let name = cmd.name();
    debug!(command = name, principal = %s.principal(), "execute");

    let result = match cmd {
        Command::Ping => database::ping(),
        Command::Info => database::info(s),
        Command::Flush => database::flush(s),

        Command::ExperimentCreate { name, tags } => experiment::create(s, &name, tags),
        Command::ExperimentGet { experiment_id } => experiment::get(s, &experiment_id),
        Command::ExperimentGetByName { name } => experiment::get_by_name(s, &name),
        Command::ExperimentList { include_deleted } => experiment::list(s, include_deleted),
        Command::ExperimentDelete { experiment_id } => experiment::delete(s, &experiment_id),
        Command::ExperimentRestore { experiment_id } => experiment::restore(s, &experiment_id),
        Command::PermissionGrant {
            experiment_id,
            principal,
            permission,
        } => experiment::grant(s, &experiment_id, &principal, permission),
        Command::PermissionRevoke {
            experiment_id,
            principal,
        } => experiment::revoke(s, &experiment_id, &principal),

        Command::TraceLog(new_trace) => trace::log(s, new_trace),
        Command::TraceStart {
            experiment_id,
            request_metadata,
            tags,
        } => trace::start(s, &experiment_id, request_metadata, tags),
        Command::TraceEnd {
            trace_id,
            status,
            spans,
            end_time_ms,
        } => trace::end(s, &trace_id, status, spans, end_time_ms),
        Command::TraceGet { trace_id } => trace::get(s, &trace_id),
        Command::TraceSetTag {
            trace_id,
            key,
            value,
        } => trace::set_tag(s, &trace_id, &key, &value),
        Command::TraceDeleteTag { trace_id, key } => trace::delete_tag(s, &trace_id, &key),
        Command::TraceCount { experiment_id } => trace::count(s, &experiment_id),
        Command::TraceSearch(request) => trace::search(s, &request),
        Command::TraceDelete(request) => trace::delete(s, &request),
        Command::TracePurge {
            experiment_id,
            max_timestamp_millis,
            batch_size,
            pause_ms,
        } => trace::purge(s, &experiment_id, max_timestamp_millis, batch_size, pause_ms),
    };

    if let Err(e) = &result {
        debug!(command = name, code = e.code().as_str(), error = %e, "command failed");
    }
    result
}
