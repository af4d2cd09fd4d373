//! Network surface for Tracebase
//!
//! One JSON document per line in each direction over TCP. A request names
//! a [`Command`](tracebase_executor::Command) and, optionally, the principal
//! to run it as:
//!
//! ```json
//! {"id":7,"principal":"alice","command":{"TraceDelete":{"experiment_id":"1","max_timestamp_millis":100}}}
//! ```
//!
//! The reply echoes the id and carries either `ok` or `error`:
//!
//! ```json
//! {"id":7,"ok":{"TracesDeleted":42}}
//! {"id":7,"error":{"code":"RESOURCE_DOES_NOT_EXIST","message":"not found: experiment '1'"}}
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use config::{ServerConfig, DEFAULT_LISTEN};
pub use error::{ClientError, ServerError};
pub use protocol::{Reply, Request, Response};
pub use server::Server;
