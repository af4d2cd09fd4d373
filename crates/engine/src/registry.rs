//! Experiment registry
//!
//! Holds every experiment ever created, including soft-deleted ones, and
//! allocates ids. Names are unique across all stages.

use std::collections::{BTreeMap, HashMap};
use tracebase_core::{Experiment, ExperimentId, LifecycleStage};

#[derive(Debug, Default)]
pub(crate) struct ExperimentRegistry {
    by_id: BTreeMap<u64, Experiment>,
    // Ids that are not engine-allocated decimals, kept apart so ordering stays numeric
    other: BTreeMap<ExperimentId, Experiment>,
    by_name: HashMap<String, ExperimentId>,
    next_index: u64,
}

impl ExperimentRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Id the next created experiment will receive
    pub(crate) fn next_id(&self) -> ExperimentId {
        ExperimentId::from_index(self.next_index)
    }

    pub(crate) fn insert(&mut self, experiment: Experiment) {
        self.by_name
            .insert(experiment.name.clone(), experiment.experiment_id.clone());
        match canonical_index(&experiment.experiment_id) {
            Some(index) => {
                self.next_index = self.next_index.max(index + 1);
                self.by_id.insert(index, experiment);
            }
            None => {
                self.other.insert(experiment.experiment_id.clone(), experiment);
            }
        }
    }

    pub(crate) fn get(&self, experiment_id: &ExperimentId) -> Option<&Experiment> {
        match canonical_index(experiment_id) {
            Some(index) => self.by_id.get(&index),
            None => self.other.get(experiment_id),
        }
    }

    fn get_mut(&mut self, experiment_id: &ExperimentId) -> Option<&mut Experiment> {
        match canonical_index(experiment_id) {
            Some(index) => self.by_id.get_mut(&index),
            None => self.other.get_mut(experiment_id),
        }
    }

    /// Active experiment with this id
    pub(crate) fn active(&self, experiment_id: &ExperimentId) -> Option<&Experiment> {
        self.get(experiment_id).filter(|e| e.is_active())
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Option<&Experiment> {
        self.by_name.get(name).and_then(|id| self.get(id))
    }

    pub(crate) fn name_taken(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn set_stage(
        &mut self,
        experiment_id: &ExperimentId,
        stage: LifecycleStage,
        at_ms: u64,
    ) -> bool {
        match self.get_mut(experiment_id) {
            Some(experiment) => {
                experiment.lifecycle_stage = stage;
                experiment.last_update_time_ms = at_ms;
                true
            }
            None => false,
        }
    }

    /// Experiments in id order
    pub(crate) fn list(&self, include_deleted: bool) -> Vec<Experiment> {
        self.by_id
            .values()
            .chain(self.other.values())
            .filter(|e| include_deleted || e.is_active())
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len() + self.other.len()
    }
}

/// Numeric index when the id is in its canonical decimal form ("7", not "07")
fn canonical_index(experiment_id: &ExperimentId) -> Option<u64> {
    experiment_id
        .index()
        .filter(|index| index.to_string() == experiment_id.as_str())
}
