//! # Tracebase
//!
//! Embedded store for experiment traces with durable, irreversible trace
//! deletion.
//!
//! Traces belong to experiments. Old traces are removed either by cutoff
//! (oldest first, optionally capped) or by explicit id, and a deletion that
//! returned is never undone, not even by a crash.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tracebase::prelude::*;
//!
//! let db = Tracebase::open("./traces")?;
//! let exp = db.experiments.create("checkout-bot")?;
//!
//! db.traces.log(NewTrace::new(exp.clone()).tag("model", "small"))?;
//!
//! // Delete up to 100 of the oldest traces created before the cutoff
//! let deleted = db.traces.delete_older_than(&exp, cutoff_ms, Some(100))?;
//!
//! // Or drain the whole backlog in batches
//! let report = db.traces.purge(&exp, cutoff_ms)?;
//!
//! db.close()?;
//! ```
//!
//! ## Principals
//!
//! A handle opened directly acts as the built-in system principal.
//! [`Tracebase::as_user`] returns a handle whose calls are checked against
//! that user's experiment permissions.
//!
//! ## Primitives
//!
//! - [`Experiments`] - Experiment lifecycle and permissions
//! - [`Traces`] - Logging, search and deletion

#![warn(missing_docs)]

mod database;
mod primitives;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{Tracebase, TracebaseBuilder};
pub use tracebase_core::{Error, ErrorCode, Result, WireError};

// Re-export primitives
pub use primitives::{Experiments, Traces};

// Re-export types
pub use types::*;
