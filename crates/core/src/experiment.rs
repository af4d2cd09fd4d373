//! Experiment types

use crate::types::ExperimentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the experiment created when a database is first opened
pub const DEFAULT_EXPERIMENT_NAME: &str = "Default";

/// Whether an experiment is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Visible and writable
    #[default]
    Active,
    /// Soft-deleted; can be restored
    Deleted,
}

/// A named container grouping related traces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Engine-allocated id
    pub experiment_id: ExperimentId,
    /// Unique name
    pub name: String,
    /// Active or soft-deleted
    pub lifecycle_stage: LifecycleStage,
    /// Creation time (milliseconds since epoch)
    pub creation_time_ms: u64,
    /// Last lifecycle change (milliseconds since epoch)
    pub last_update_time_ms: u64,
    /// Experiment tags
    pub tags: BTreeMap<String, String>,
}

impl Experiment {
    /// Whether the experiment is visible to trace operations
    pub fn is_active(&self) -> bool {
        self.lifecycle_stage == LifecycleStage::Active
    }
}
