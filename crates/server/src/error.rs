//! Server and client errors.

use tracebase_core::WireError;

/// Failures of the server itself
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database failed to flush on shutdown
    #[error(transparent)]
    Database(#[from] tracebase_core::Error),

    /// Unusable settings
    #[error("invalid server config: {0}")]
    Config(String),
}

/// Failures seen by a [`Client`](crate::Client)
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent something that is not a response
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server closed the connection
    #[error("connection closed by server")]
    Closed,

    /// The command failed on the server
    #[error("{} ({})", .0.message, .0.code)]
    Remote(WireError),
}

impl ClientError {
    /// The server-side error, when the command reached the database
    pub fn remote(&self) -> Option<&WireError> {
        match self {
            ClientError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for tracebase_core::Error {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Remote(wire) => wire.into_error(),
            other => tracebase_core::Error::service(other.to_string()),
        }
    }
}
