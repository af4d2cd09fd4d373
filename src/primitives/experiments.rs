//! Experiment primitive.
//!
//! ```ignore
//! let exp = db.experiments.create("checkout-bot")?;
//! db.experiments.grant(&exp, "alice", Permission::Manage)?;
//! db.experiments.delete(&exp)?;
//! db.experiments.restore(&exp)?;
//! ```

use std::collections::BTreeMap;

use tracebase_api::{ExperimentStore, SubstrateImpl};

use crate::{Experiment, ExperimentId, Permission, Principal, Result};

/// Experiment operations.
///
/// Access via `db.experiments`.
#[derive(Debug, Clone)]
pub struct Experiments {
    substrate: SubstrateImpl,
}

impl Experiments {
    pub(crate) fn new(substrate: SubstrateImpl) -> Self {
        Self { substrate }
    }

    /// Create an experiment.
    pub fn create(&self, name: &str) -> Result<ExperimentId> {
        self.substrate.experiment_create(name, BTreeMap::new())
    }

    /// Create an experiment with tags.
    pub fn create_with_tags<I, K, V>(&self, name: &str, tags: I) -> Result<ExperimentId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.substrate.experiment_create(name, tags)
    }

    /// Get an experiment, deleted ones included.
    pub fn get(&self, id: &ExperimentId) -> Result<Experiment> {
        self.substrate.experiment_get(id)
    }

    /// Find an experiment by name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        self.substrate.experiment_get_by_name(name)
    }

    /// Active experiments the caller can read.
    pub fn list(&self) -> Result<Vec<Experiment>> {
        self.substrate.experiment_list(false)
    }

    /// All experiments the caller can read, deleted ones included.
    pub fn list_all(&self) -> Result<Vec<Experiment>> {
        self.substrate.experiment_list(true)
    }

    /// Soft-delete an experiment. Its traces become invisible.
    pub fn delete(&self, id: &ExperimentId) -> Result<()> {
        self.substrate.experiment_delete(id)
    }

    /// Restore a soft-deleted experiment.
    pub fn restore(&self, id: &ExperimentId) -> Result<()> {
        self.substrate.experiment_restore(id)
    }

    /// Grant `user` a permission level on an experiment.
    pub fn grant(&self, id: &ExperimentId, user: &str, permission: Permission) -> Result<()> {
        self.substrate
            .permission_grant(id, &Principal::new(user), permission)
    }

    /// Remove `user`'s explicit grant. Returns whether one existed.
    pub fn revoke(&self, id: &ExperimentId, user: &str) -> Result<bool> {
        self.substrate.permission_revoke(id, &Principal::new(user))
    }
}
