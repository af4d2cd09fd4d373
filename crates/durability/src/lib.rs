//! Durability layer for Tracebase
//!
//! This crate implements write-ahead logging:
//! - WalRecord types: experiment lifecycle, trace writes, trace deletion, grants
//! - Entry encoding/decoding with CRC32 checksums
//! - Durability modes: InMemory, Buffered (default), Strict
//! - Replay on open, with torn-tail truncation and a corruption budget

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod wal;

pub use encoding::{decode_entry, encode_entry, DecodeError, FRAME_HEADER_LEN, MAX_FRAME_LEN};
pub use error::DurabilityError;
pub use wal::{DurabilityMode, ReplayOptions, ReplayReport, Wal, WalEntry, WalRecord};
