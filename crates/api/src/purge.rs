//! Batched trace purge
//!
//! Deleting a large backlog in one call holds the commit lock for as long as
//! the whole selection takes. The purge loop instead deletes in capped
//! batches, optionally pausing between them, until a batch comes back short.

use crate::substrate::TraceStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracebase_core::{DeleteTracesRequest, Error, ExperimentId, Result};
use tracing::{debug, info};

/// Batch size used when none is given
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

/// Delete every trace older than a cutoff, `batch_size` at a time
///
/// ```ignore
/// let report = BatchPurge::new("1", cutoff_ms)
///     .batch_size(500)
///     .pause(Duration::from_millis(50))
///     .run(&store)?;
/// println!("deleted {} traces in {} batches", report.deleted, report.batches);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPurge {
    /// Experiment to purge
    pub experiment_id: ExperimentId,
    /// Delete traces created strictly before this time
    pub max_timestamp_millis: i64,
    /// `max_traces` of each call
    pub batch_size: u64,
    /// Sleep between batches
    pub pause: Duration,
}

/// Outcome of a purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    /// Delete calls made, including the final short one
    pub batches: u64,
    /// Traces removed in total
    pub deleted: u64,
}

impl BatchPurge {
    /// Purge with the default batch size and no pause
    pub fn new(experiment_id: impl Into<ExperimentId>, max_timestamp_millis: i64) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            max_timestamp_millis,
            batch_size: DEFAULT_BATCH_SIZE,
            pause: Duration::ZERO,
        }
    }

    /// Traces deleted per call
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sleep between calls
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run the purge loop
    ///
    /// Stops after the first batch that deletes fewer than `batch_size`
    /// traces. An error stops the loop and is returned as is; traces deleted
    /// by earlier batches stay deleted, so re-query before retrying.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `batch_size` is zero or exceeds `i64::MAX`;
    /// otherwise whatever `trace_delete` reports.
    pub fn run<S: TraceStore + ?Sized>(&self, store: &S) -> Result<PurgeReport> {
        if self.batch_size == 0 {
            return Err(Error::invalid_argument("`batch_size` must be positive"));
        }
        let max_traces = i64::try_from(self.batch_size)
            .map_err(|_| Error::invalid_argument("`batch_size` is too large"))?;
        let request = DeleteTracesRequest::older_than(
            self.experiment_id.as_str(),
            self.max_timestamp_millis,
        )
        .with_max_traces(max_traces);

        let mut report = PurgeReport::default();
        loop {
            let deleted = store.trace_delete(&request)?;
            report.batches += 1;
            report.deleted += deleted;
            debug!(
                experiment = %self.experiment_id,
                batch = report.batches,
                deleted,
                "purge batch"
            );
            if deleted < self.batch_size {
                break;
            }
            if !self.pause.is_zero() {
                std::thread::sleep(self.pause);
            }
        }

        info!(
            experiment = %self.experiment_id,
            batches = report.batches,
            deleted = report.deleted,
            "purge finished"
        );
        Ok(report)
    }
}
