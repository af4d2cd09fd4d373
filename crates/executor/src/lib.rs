//! Command execution layer for Tracebase
//!
//! Every operation the database offers is a [`Command`]; every successful
//! result is an [`Output`]. The [`Executor`] maps one to the other, which
//! gives the server and the CLI a single serializable surface.
//!
//! ```ignore
//! let executor = Executor::new(SubstrateImpl::new(db));
//! let out = executor.execute(Command::TraceDelete(
//!     DeleteTracesRequest::older_than("1", cutoff_ms).with_max_traces(100),
//! ))?;
//! assert!(matches!(out, Output::TracesDeleted(_)));
//! ```
//!
//! [`Session`] wraps the executor with typed methods.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod error;
mod executor;
pub mod handlers;
mod output;
mod session;


pub use command::Command;
pub use error::{Error, Result};
pub use executor::Executor;
pub use output::Output;
pub use session::Session;
