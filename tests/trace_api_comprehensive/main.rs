//! Trace API Comprehensive Test Suite
//!
//! Exercises the public `tracebase` facade end to end: deletion semantics,
//! request validation, batching, experiment lifecycle, permissions, search,
//! recovery after reopen, and concurrent deleters.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test trace_api_comprehensive
//!
//! # Deletion tests only
//! cargo test --test trace_api_comprehensive deletion::
//! ```

pub use tracebase::prelude::*;
pub use tracebase::{DurabilityMode, ErrorCode, TraceInfo};

// Test modules
pub mod batching;
pub mod concurrency;
pub mod deletion;
pub mod durability;
pub mod experiments;
pub mod permissions;
pub mod properties;
pub mod search;
pub mod validation;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// The experiment every database starts with
pub fn default_exp() -> ExperimentId {
    ExperimentId::new("0")
}

/// Run a test body against each durability mode
pub fn test_across_modes<F>(f: F)
where
    F: Fn(Tracebase),
{
    f(Tracebase::ephemeral().expect("ephemeral database"));

    let buffered = tempfile::tempdir().unwrap();
    f(Tracebase::builder()
        .path(buffered.path())
        .buffered()
        .open()
        .expect("buffered database"));

    let strict = tempfile::tempdir().unwrap();
    f(Tracebase::builder()
        .path(strict.path())
        .strict()
        .open()
        .expect("strict database"));
}

/// Log `count` traces into `exp` with timestamps `0..count`
pub fn seed(db: &Tracebase, exp: &ExperimentId, count: u64) -> Vec<TraceId> {
    (0..count)
        .map(|ts| {
            db.traces
                .log(NewTrace::new(exp.clone()).at(ts))
                .expect("log trace")
                .trace_id
        })
        .collect()
}

/// Log one trace with an explicit id and timestamp
pub fn log_with_id(db: &Tracebase, exp: &ExperimentId, id: &str, ts: u64) -> TraceId {
    db.traces
        .log(
            NewTrace::new(exp.clone())
                .with_id(TraceId::parse(id).unwrap())
                .at(ts),
        )
        .expect("log trace")
        .trace_id
}
