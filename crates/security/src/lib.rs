//! Access control and open options for Tracebase.
//!
//! This crate provides:
//! - [`AccessMode`] and [`OpenOptions`]: how a database is opened
//! - [`Principal`] and [`Permission`]: who is calling and what they may do
//! - [`AccessPolicy`]: per-experiment grants with a database-wide default

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracebase_core::{Error, ExperimentId, Result};

/// Controls whether the database allows writes or is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Options for opening a database.
///
/// ```ignore
/// use tracebase_security::{OpenOptions, AccessMode};
///
/// let opts = OpenOptions::new().access_mode(AccessMode::ReadOnly);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub access_mode: AccessMode,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Reject mutations when opened read-only
    pub fn check_writable(&self) -> Result<()> {
        match self.access_mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(Error::permission_denied("database is opened read-only")),
        }
    }
}

/// Permission level on an experiment, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// No access at all
    NoPermissions,
    /// Read experiments and traces
    Read,
    /// Read plus log traces and edit tags
    Edit,
    /// Everything, including deletion
    Manage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::NoPermissions => "NO_PERMISSIONS",
            Permission::Read => "READ",
            Permission::Edit => "EDIT",
            Permission::Manage => "MANAGE",
        }
    }

    /// Whether this level includes `required`
    pub fn allows(&self, required: Permission) -> bool {
        *self >= required
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NO_PERMISSIONS" => Ok(Permission::NoPermissions),
            "READ" => Ok(Permission::Read),
            "EDIT" => Ok(Permission::Edit),
            "MANAGE" => Ok(Permission::Manage),
            other => Err(Error::invalid_argument(format!("unknown permission '{}'", other))),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The named caller an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

/// Name of the built-in principal that bypasses grants
pub const SYSTEM_PRINCIPAL: &str = "system";

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Principal(name.into())
    }

    /// The built-in principal; always has `Manage`
    pub fn system() -> Self {
        Principal(SYSTEM_PRINCIPAL.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_PRINCIPAL
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Principal {
    fn default() -> Self {
        Principal::system()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-experiment permission grants.
///
/// Lookups fall back to `default_permission` when no grant exists for the
/// `(experiment, principal)` pair. The system principal always resolves to
/// `Manage`.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    default_permission: Permission,
    grants: HashMap<(ExperimentId, Principal), Permission>,
}

impl AccessPolicy {
    pub fn new(default_permission: Permission) -> Self {
        Self {
            default_permission,
            grants: HashMap::new(),
        }
    }

    pub fn default_permission(&self) -> Permission {
        self.default_permission
    }

    /// Effective permission of `principal` on `experiment_id`
    pub fn effective(&self, principal: &Principal, experiment_id: &ExperimentId) -> Permission {
        if principal.is_system() {
            return Permission::Manage;
        }
        self.grants
            .get(&(experiment_id.clone(), principal.clone()))
            .copied()
            .unwrap_or(self.default_permission)
    }

    /// Fail with `PermissionDenied` unless `principal` holds `required`
    pub fn check(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        required: Permission,
    ) -> Result<()> {
        let held = self.effective(principal, experiment_id);
        if held.allows(required) {
            Ok(())
        } else {
            Err(Error::permission_denied(format!(
                "user '{}' has {} on experiment {}, {} required",
                principal, held, experiment_id, required
            )))
        }
    }

    pub fn grant(&mut self, experiment_id: ExperimentId, principal: Principal, permission: Permission) {
        self.grants.insert((experiment_id, principal), permission);
    }

    /// Whether an explicit grant exists for the pair
    pub fn has_grant(&self, experiment_id: &ExperimentId, principal: &Principal) -> bool {
        self.grants
            .contains_key(&(experiment_id.clone(), principal.clone()))
    }

    /// Remove an explicit grant; returns whether one existed
    pub fn revoke(&mut self, experiment_id: &ExperimentId, principal: &Principal) -> bool {
        self.grants
            .remove(&(experiment_id.clone(), principal.clone()))
            .is_some()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy::new(Permission::Manage)
    }
}
