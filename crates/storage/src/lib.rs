//! Storage layer for Tracebase
//!
//! This crate implements the in-memory trace store:
//! - ShardedStore: DashMap of per-experiment shards
//! - Per-shard time index for oldest-first selection
//! - Global trace-id locator for id-only lookups
//! - Commit version counter

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;

pub use sharded::{Shard, ShardedStore};
