//! Canonical error taxonomy
//!
//! Every fallible operation in Tracebase reports one of four categories.
//! Internal faults (IO, WAL corruption, serialization) are folded into
//! [`Error::Service`] before they reach a caller.
//!
//! ## Wire Format
//!
//! Errors encode to JSON as:
//! ```json
//! {"code": "INVALID_PARAMETER_VALUE", "message": "invalid argument: ..."}
//! ```
//!
//! ## Error Codes
//!
//! These codes are frozen and must not change:
//!
//! | Variant | Code |
//! |---------|------|
//! | NotFound | RESOURCE_DOES_NOT_EXIST |
//! | PermissionDenied | PERMISSION_DENIED |
//! | InvalidArgument | INVALID_PARAMETER_VALUE |
//! | Service | INTERNAL_ERROR |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for Tracebase operations
pub type Result<T> = std::result::Result<T, Error>;

/// All Tracebase errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Experiment or trace does not exist, or is not visible to the caller
    #[error("not found: {entity}")]
    NotFound {
        /// Description of the missing entity (e.g. `experiment 7`)
        entity: String,
    },

    /// Caller lacks the required permission, or the database is read-only
    #[error("permission denied: {reason}")]
    PermissionDenied {
        /// Why the operation was refused
        reason: String,
    },

    /// Malformed combination of parameters or out-of-range values
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which constraint was violated
        reason: String,
    },

    /// Transport or backend fault
    #[error("service error: {reason}")]
    Service {
        /// Underlying fault description
        reason: String,
    },
}

impl Error {
    /// Create a `NotFound` error
    pub fn not_found(entity: impl Into<String>) -> Self {
        Error::NotFound {
            entity: entity.into(),
        }
    }

    /// Create a `PermissionDenied` error
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Error::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Create an `InvalidArgument` error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a `Service` error
    pub fn service(reason: impl Into<String>) -> Self {
        Error::Service {
            reason: reason.into(),
        }
    }

    /// Wire code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound { .. } => ErrorCode::ResourceDoesNotExist,
            Error::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Error::InvalidArgument { .. } => ErrorCode::InvalidParameterValue,
            Error::Service { .. } => ErrorCode::InternalError,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a permission error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }

    /// Check if this is an argument validation error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    /// Check if this is a transport/backend fault
    pub fn is_service(&self) -> bool {
        matches!(self, Error::Service { .. })
    }

    /// Whether a retry must be preceded by re-reading state
    ///
    /// Deletion is irreversible and a service fault may have happened after
    /// part of the work was committed. Only service faults are candidates for
    /// retry at all; validation, visibility and permission failures are final.
    pub fn retry_requires_verification(&self) -> bool {
        self.is_service()
    }

    /// Convert to the wire representation
    pub fn to_wire(&self) -> WireError {
        WireError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::service(format!("I/O error: {}", e))
    }
}

/// Stable machine-readable error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Entity not found
    ResourceDoesNotExist,
    /// Authorization failure
    PermissionDenied,
    /// Parameter contract violation
    InvalidParameterValue,
    /// Transport or backend fault
    InternalError,
}

impl ErrorCode {
    /// The code as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ResourceDoesNotExist => "RESOURCE_DOES_NOT_EXIST",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::InvalidParameterValue => "INVALID_PARAMETER_VALUE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire error representation for JSON encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// The canonical error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl WireError {
    /// Rebuild the typed error on the receiving side
    ///
    /// The message already carries the category prefix added by `Display`;
    /// it is stripped so that re-encoding does not double it.
    pub fn into_error(self) -> Error {
        fn strip(message: String, prefix: &str) -> String {
            message
                .strip_prefix(prefix)
                .map(str::to_string)
                .unwrap_or(message)
        }
        match self.code {
            ErrorCode::ResourceDoesNotExist => Error::not_found(strip(self.message, "not found: ")),
            ErrorCode::PermissionDenied => {
                Error::permission_denied(strip(self.message, "permission denied: "))
            }
            ErrorCode::InvalidParameterValue => {
                Error::invalid_argument(strip(self.message, "invalid argument: "))
            }
            ErrorCode::InternalError => Error::service(strip(self.message, "service error: ")),
        }
    }
}
