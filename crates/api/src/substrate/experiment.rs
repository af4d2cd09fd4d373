//! ExperimentStore Substrate Operations
//!
//! Experiments group traces. Ids are allocated by the engine as increasing
//! decimal strings; `"0"` is the default experiment.
//!
//! ## Lifecycle
//!
//! `Active → Deleted` via `experiment_delete` (soft), `Deleted → Active` via
//! `experiment_restore`. Traces of a deleted experiment are kept but every
//! trace operation on them reports `NotFound`.

use super::SubstrateImpl;
use std::collections::BTreeMap;
use tracebase_core::{Experiment, ExperimentId, Result};
use tracebase_security::{Permission, Principal};

/// ExperimentStore substrate operations
///
/// ## Error Handling
///
/// | Condition | Error |
/// |-----------|-------|
/// | Empty or duplicate name | `InvalidArgument` |
/// | Unknown experiment | `NotFound` |
/// | Missing permission, read-only database | `PermissionDenied` |
pub trait ExperimentStore {
    /// Create an experiment; the caller is granted `Manage` on it
    fn experiment_create(&self, name: &str, tags: BTreeMap<String, String>)
        -> Result<ExperimentId>;

    /// Get an experiment in any stage
    fn experiment_get(&self, experiment_id: &ExperimentId) -> Result<Experiment>;

    /// Get an experiment by name, `None` when no experiment has it
    fn experiment_get_by_name(&self, name: &str) -> Result<Option<Experiment>>;

    /// Experiments readable by the caller, in id order
    fn experiment_list(&self, include_deleted: bool) -> Result<Vec<Experiment>>;

    /// Soft-delete an experiment (requires `Manage`)
    fn experiment_delete(&self, experiment_id: &ExperimentId) -> Result<()>;

    /// Restore a soft-deleted experiment (requires `Manage`)
    fn experiment_restore(&self, experiment_id: &ExperimentId) -> Result<()>;

    /// Grant a permission level (system principal only)
    fn permission_grant(
        &self,
        experiment_id: &ExperimentId,
        grantee: &Principal,
        permission: Permission,
    ) -> Result<()>;

    /// Revoke an explicit grant; returns whether one existed (system principal only)
    fn permission_revoke(&self, experiment_id: &ExperimentId, grantee: &Principal)
        -> Result<bool>;
}

impl ExperimentStore for SubstrateImpl {
    fn experiment_create(
        &self,
        name: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<ExperimentId> {
        self.database()
            .create_experiment(self.principal(), name, tags)
    }

    fn experiment_get(&self, experiment_id: &ExperimentId) -> Result<Experiment> {
        self.database().get_experiment(self.principal(), experiment_id)
    }

    fn experiment_get_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        self.database()
            .get_experiment_by_name(self.principal(), name)
    }

    fn experiment_list(&self, include_deleted: bool) -> Result<Vec<Experiment>> {
        Ok(self
            .database()
            .list_experiments(self.principal(), include_deleted))
    }

    fn experiment_delete(&self, experiment_id: &ExperimentId) -> Result<()> {
        self.database()
            .delete_experiment(self.principal(), experiment_id)
    }

    fn experiment_restore(&self, experiment_id: &ExperimentId) -> Result<()> {
        self.database()
            .restore_experiment(self.principal(), experiment_id)
    }

    fn permission_grant(
        &self,
        experiment_id: &ExperimentId,
        grantee: &Principal,
        permission: Permission,
    ) -> Result<()> {
        self.database()
            .grant_permission(self.principal(), experiment_id, grantee, permission)
    }

    fn permission_revoke(
        &self,
        experiment_id: &ExperimentId,
        grantee: &Principal,
    ) -> Result<bool> {
        self.database()
            .revoke_permission(self.principal(), experiment_id, grantee)
    }
}
