//! Durability errors

use thiserror::Error;

/// Errors raised by the WAL
#[derive(Debug, Error)]
pub enum DurabilityError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("encode error: {0}")]
    Encode(String),

    /// Too many corrupt records found during replay
    #[error("too many corrupt WAL records: {found} (max allowed: {max})")]
    TooManyCorruptRecords {
        /// Corrupt records seen
        found: usize,
        /// Configured budget
        max: usize,
    },
}

impl From<DurabilityError> for tracebase_core::Error {
    fn from(e: DurabilityError) -> Self {
        tracebase_core::Error::service(e.to_string())
    }
}
