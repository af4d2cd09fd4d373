//! Experiment lifecycle and permission grants

use crate::database::Database;
use std::collections::BTreeMap;
use tracebase_core::{now_millis, Error, Experiment, ExperimentId, LifecycleStage, Result};
use tracebase_durability::WalRecord;
use tracebase_security::{Permission, Principal};
use tracing::info;

/// Longest experiment name accepted, in bytes
pub const MAX_EXPERIMENT_NAME_LEN: usize = 500;

impl Database {
    /// Create an experiment and return its id
    ///
    /// The creating principal is granted `Manage` on the new experiment.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty, overlong or already used name
    /// - `PermissionDenied`: read-only database
    pub fn create_experiment(
        &self,
        principal: &Principal,
        name: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<ExperimentId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_argument("experiment name must not be empty"));
        }
        if name.len() > MAX_EXPERIMENT_NAME_LEN {
            return Err(Error::invalid_argument(format!(
                "experiment name exceeds {} bytes",
                MAX_EXPERIMENT_NAME_LEN
            )));
        }
        for key in tags.keys() {
            tracebase_core::validate_tag_key(key)?;
        }
        self.check_writable()?;

        let guard = self.lock_commit();
        let experiment_id = {
            let registry = self.experiments.read();
            if registry.name_taken(name) {
                return Err(Error::invalid_argument(format!(
                    "experiment '{}' already exists",
                    name
                )));
            }
            registry.next_id()
        };

        let now = now_millis();
        self.commit(
            &guard,
            WalRecord::CreateExperiment {
                experiment: Experiment {
                    experiment_id: experiment_id.clone(),
                    name: name.to_string(),
                    lifecycle_stage: LifecycleStage::Active,
                    creation_time_ms: now,
                    last_update_time_ms: now,
                    tags,
                },
            },
        )?;
        if !principal.is_system() {
            self.commit(
                &guard,
                WalRecord::SetPermission {
                    experiment_id: experiment_id.clone(),
                    principal: principal.clone(),
                    permission: Some(Permission::Manage),
                },
            )?;
        }

        info!(experiment = %experiment_id, experiment_name = %name, user = %principal, "experiment created");
        Ok(experiment_id)
    }

    /// Get an experiment in any lifecycle stage
    pub fn get_experiment(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
    ) -> Result<Experiment> {
        let experiment = self
            .experiments
            .read()
            .get(experiment_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("experiment '{}'", experiment_id)))?;
        self.authorize(principal, experiment_id, Permission::Read)?;
        Ok(experiment)
    }

    /// Look up an experiment by its unique name
    pub fn get_experiment_by_name(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<Option<Experiment>> {
        let experiment = self.experiments.read().get_by_name(name).cloned();
        match experiment {
            Some(experiment) => {
                self.authorize(principal, &experiment.experiment_id, Permission::Read)?;
                Ok(Some(experiment))
            }
            None => Ok(None),
        }
    }

    /// Experiments `principal` may read, in id order
    pub fn list_experiments(&self, principal: &Principal, include_deleted: bool) -> Vec<Experiment> {
        let experiments = self.experiments.read().list(include_deleted);
        let policy = self.policy.read();
        experiments
            .into_iter()
            .filter(|e| {
                policy
                    .effective(principal, &e.experiment_id)
                    .allows(Permission::Read)
            })
            .collect()
    }

    /// Soft-delete an experiment; its traces stay stored but invisible
    pub fn delete_experiment(&self, principal: &Principal, experiment_id: &ExperimentId) -> Result<()> {
        self.check_writable()?;
        let guard = self.lock_commit();
        self.resolve_active(experiment_id)?;
        self.authorize(principal, experiment_id, Permission::Manage)?;
        self.commit(
            &guard,
            WalRecord::SetExperimentStage {
                experiment_id: experiment_id.clone(),
                stage: LifecycleStage::Deleted,
                at_ms: now_millis(),
            },
        )?;
        info!(experiment = %experiment_id, user = %principal, "experiment deleted");
        Ok(())
    }

    /// Undo a soft delete
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the experiment is active.
    pub fn restore_experiment(&self, principal: &Principal, experiment_id: &ExperimentId) -> Result<()> {
        self.check_writable()?;
        let guard = self.lock_commit();
        let experiment = self
            .experiments
            .read()
            .get(experiment_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("experiment '{}'", experiment_id)))?;
        self.authorize(principal, experiment_id, Permission::Manage)?;
        if experiment.is_active() {
            return Err(Error::invalid_argument(format!(
                "experiment '{}' is not deleted",
                experiment_id
            )));
        }
        self.commit(
            &guard,
            WalRecord::SetExperimentStage {
                experiment_id: experiment_id.clone(),
                stage: LifecycleStage::Active,
                at_ms: now_millis(),
            },
        )?;
        info!(experiment = %experiment_id, user = %principal, "experiment restored");
        Ok(())
    }

    /// Grant `grantee` a permission level on an experiment
    ///
    /// Only the system principal manages grants.
    pub fn grant_permission(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        grantee: &Principal,
        permission: Permission,
    ) -> Result<()> {
        self.set_permission(principal, experiment_id, grantee, Some(permission))
            .map(|_| ())
    }

    /// Remove an explicit grant; returns whether one existed
    pub fn revoke_permission(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        grantee: &Principal,
    ) -> Result<bool> {
        self.set_permission(principal, experiment_id, grantee, None)
    }

    fn set_permission(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        grantee: &Principal,
        permission: Option<Permission>,
    ) -> Result<bool> {
        if !principal.is_system() {
            return Err(Error::permission_denied(format!(
                "user '{}' cannot manage permissions",
                principal
            )));
        }
        self.check_writable()?;
        let guard = self.lock_commit();
        if self.experiments.read().get(experiment_id).is_none() {
            return Err(Error::not_found(format!("experiment '{}'", experiment_id)));
        }
        let existed = self.policy.read().has_grant(experiment_id, grantee);
        if permission.is_none() && !existed {
            return Ok(false);
        }
        self.commit(
            &guard,
            WalRecord::SetPermission {
                experiment_id: experiment_id.clone(),
                principal: grantee.clone(),
                permission,
            },
        )?;
        info!(
            experiment = %experiment_id,
            grantee = %grantee,
            permission = permission.map(|p| p.as_str()).unwrap_or("revoked"),
            "permission changed"
        );
        Ok(existed)
    }

    /// Permission `principal` currently holds on an experiment
    pub fn effective_permission(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
    ) -> Permission {
        self.policy.read().effective(principal, experiment_id)
    }
}
