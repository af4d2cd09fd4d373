//! Substrate API for Tracebase
//!
//! - [`substrate`]: [`ExperimentStore`] and [`TraceStore`] traits with
//!   [`SubstrateImpl`], every call bound to a calling principal
//! - [`search`]: trace filtering, ordering and page tokens
//! - [`purge`]: the batched purge loop over trace deletion

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod purge;
pub mod search;
pub mod substrate;

pub use purge::{BatchPurge, PurgeReport, DEFAULT_BATCH_SIZE};
pub use search::{
    SearchTraces, TraceFilter, TraceOrder, TracePage, DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT,
};
pub use substrate::{ExperimentStore, SubstrateImpl, TraceStore};
