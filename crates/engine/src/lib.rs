//! Database engine for Tracebase
//!
//! This crate orchestrates the lower layers:
//! - Storage: sharded per-experiment trace maps ([`tracebase_storage`])
//! - Durability: the write-ahead log ([`tracebase_durability`])
//! - Security: open options and permission grants ([`tracebase_security`])
//!
//! [`Database`] is the single entry point. All mutations go through one
//! commit path that logs a WAL record before applying it, including the
//! trace deletion operation ([`Database::delete_traces`]).

#![warn(clippy::all)]

pub mod config;
pub mod database;
mod deletion;
pub mod experiments;
mod registry;
mod traces;

pub use config::{ConfigError, DatabaseConfig, DurabilitySetting, CONFIG_FILE_NAME};
pub use database::{Database, DatabaseBuilder, DatabaseInfo, WAL_FILE_NAME};
pub use experiments::MAX_EXPERIMENT_NAME_LEN;
pub use tracebase_durability::DurabilityMode;
