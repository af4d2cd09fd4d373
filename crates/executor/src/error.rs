//! Executor errors.
//!
//! Domain failures pass through as [`tracebase_core::Error`]; the executor only
//! adds the failures of its own layer.

use tracebase_core::{ErrorCode, WireError};

/// Errors returned by [`Executor::execute`](crate::Executor::execute)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Failure reported by the database
    #[error(transparent)]
    Core(#[from] tracebase_core::Error),

    /// Command could not be decoded
    #[error("malformed command: {reason}")]
    MalformedCommand {
        /// Decoder message
        reason: String,
    },

    /// A handler produced an output of the wrong kind
    #[error("unexpected output {output} for {command}")]
    UnexpectedOutput {
        /// Command name
        command: &'static str,
        /// Output name
        output: &'static str,
    },
}

impl Error {
    /// Wire error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Core(e) => e.code(),
            Error::MalformedCommand { .. } => ErrorCode::InvalidParameterValue,
            Error::UnexpectedOutput { .. } => ErrorCode::InternalError,
        }
    }

    /// Wire representation
    pub fn to_wire(&self) -> WireError {
        match self {
            Error::Core(e) => e.to_wire(),
            other => WireError {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }

    /// The underlying database error, when there is one
    pub fn as_core(&self) -> Option<&tracebase_core::Error> {
        match self {
            Error::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for tracebase_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(e) => e,
            Error::MalformedCommand { reason } => tracebase_core::Error::invalid_argument(reason),
            other => tracebase_core::Error::service(other.to_string()),
        }
    }
}

/// Executor result type
pub type Result<T> = std::result::Result<T, Error>;
