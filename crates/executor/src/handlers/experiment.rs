//! Experiment and permission command handlers.

use std::collections::BTreeMap;

use tracebase_api::{ExperimentStore, SubstrateImpl};
use tracebase_security::{Permission, Principal};

use super::experiment_id;
use crate::{Output, Result};

/// Handle ExperimentCreate command.
pub fn create(
    substrate: &SubstrateImpl,
    name: &str,
    tags: BTreeMap<String, String>,
) -> Result<Output> {
    let id = substrate.experiment_create(name, tags)?;
    Ok(Output::ExperimentId(id))
}

/// Handle ExperimentGet command.
pub fn get(substrate: &SubstrateImpl, id: &str) -> Result<Output> {
    let experiment = substrate.experiment_get(&experiment_id(id)?)?;
    Ok(Output::Experiment(experiment))
}

/// Handle ExperimentGetByName command.
pub fn get_by_name(substrate: &SubstrateImpl, name: &str) -> Result<Output> {
    Ok(Output::MaybeExperiment(substrate.experiment_get_by_name(name)?))
}

/// Handle ExperimentList command.
pub fn list(substrate: &SubstrateImpl, include_deleted: bool) -> Result<Output> {
    Ok(Output::Experiments(substrate.experiment_list(include_deleted)?))
}

/// Handle ExperimentDelete command.
pub fn delete(substrate: &SubstrateImpl, id: &str) -> Result<Output> {
    substrate.experiment_delete(&experiment_id(id)?)?;
    Ok(Output::Unit)
}

/// Handle ExperimentRestore command.
pub fn restore(substrate: &SubstrateImpl, id: &str) -> Result<Output> {
    substrate.experiment_restore(&experiment_id(id)?)?;
    Ok(Output::Unit)
}

/// Handle PermissionGrant command.
pub fn grant(
    substrate: &SubstrateImpl,
    id: &str,
    grantee: &str,
    permission: Permission,
) -> Result<Output> {
    substrate.permission_grant(&experiment_id(id)?, &Principal::new(grantee), permission)?;
    Ok(Output::Unit)
}

/// Handle PermissionRevoke command.
pub fn revoke(substrate: &SubstrateImpl, id: &str, grantee: &str) -> Result<Output> {
    let existed = substrate.permission_revoke(&experiment_id(id)?, &Principal::new(grantee))?;
    Ok(Output::Bool(existed))
}
