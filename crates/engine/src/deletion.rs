//! Trace deletion
//!
//! Removes traces from one experiment, selected either by a timestamp cutoff
//! (optionally capped) or by an explicit id list. Deleted traces are gone for
//! good: there is no tombstone and no undo.
//!
//! ```text
//! validate (no store access)
//!   → read-only check
//!   → lock commit
//!   → experiment active?        NotFound
//!   → Manage on experiment?     PermissionDenied
//!   → select candidates
//!   → WAL DeleteTraces record   (durability point)
//!   → remove from shard
//! ```
//!
//! Selection and removal happen under the commit lock, so concurrent
//! overlapping deletions never count the same trace twice.

use crate::database::Database;
use tracebase_core::{DeleteTracesRequest, Result, TraceSelection};
use tracebase_durability::WalRecord;
use tracebase_security::{Permission, Principal};
use tracing::{debug, info};

impl Database {
    /// Delete traces matching `request`; returns how many were removed
    ///
    /// - Cutoff form: traces with `timestamp_ms < max_timestamp_millis`,
    ///   oldest first (ties by trace id), at most `max_traces`.
    /// - Id form: the listed traces that exist in this experiment. Unknown
    ///   ids and ids of other experiments are skipped.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: malformed request; nothing is deleted
    /// - `NotFound`: the experiment is missing or deleted
    /// - `PermissionDenied`: no `Manage`, or read-only database
    /// - `Service`: the WAL append failed; nothing is deleted
    pub fn delete_traces(&self, principal: &Principal, request: &DeleteTracesRequest) -> Result<u64> {
        let deletion = request.validate()?;
        self.check_writable()?;

        let guard = self.lock_commit();
        let experiment_id = deletion.experiment_id;
        self.resolve_active(&experiment_id)?;
        self.authorize(principal, &experiment_id, Permission::Manage)?;

        let selected = match &deletion.selection {
            TraceSelection::OlderThan { cutoff_ms, limit } => self.store.select_older_than(
                &experiment_id,
                *cutoff_ms,
                limit.map(|l| l.get()),
            ),
            TraceSelection::ByIds(ids) => self.store.select_existing(&experiment_id, ids),
        };
        debug!(
            experiment = %experiment_id,
            candidates = selected.len(),
            limit = ?deletion.selection.limit(),
            "selected traces for deletion"
        );

        if selected.is_empty() {
            return Ok(0);
        }

        let deleted = selected.len() as u64;
        self.commit(
            &guard,
            WalRecord::DeleteTraces {
                experiment_id: experiment_id.clone(),
                trace_ids: selected,
            },
        )?;
        info!(
            experiment = %experiment_id,
            deleted,
            user = %principal,
            "deleted traces"
        );
        Ok(deleted)
    }
}
