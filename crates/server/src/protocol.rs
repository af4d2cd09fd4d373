//! Request and response envelopes.

use serde::{Deserialize, Serialize};
use tracebase_core::{ErrorCode, WireError};
use tracebase_executor::{Command, Output};

/// One request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the response
    #[serde(default)]
    pub id: Option<u64>,
    /// Principal to run as; the server default when absent
    #[serde(default)]
    pub principal: Option<String>,
    /// What to run
    pub command: Command,
}

/// Outcome carried by a [`Response`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    /// The command succeeded
    Ok(Output),
    /// The command failed
    Error(WireError),
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request this answers; `null` when it could not be read
    pub id: Option<u64>,
    /// Result
    #[serde(flatten)]
    pub reply: Reply,
}

impl Response {
    /// Successful response
    pub fn ok(id: Option<u64>, output: Output) -> Self {
        Self {
            id,
            reply: Reply::Ok(output),
        }
    }

    /// Failed response
    pub fn error(id: Option<u64>, error: WireError) -> Self {
        Self {
            id,
            reply: Reply::Error(error),
        }
    }

    /// Encode as a single line without the trailing newline
    pub fn to_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(line) => line,
            Err(e) => {
                let fallback = Response::error(
                    self.id,
                    WireError {
                        code: ErrorCode::InternalError,
                        message: format!("service error: could not encode response: {}", e),
                    },
                );
                // WireError always serializes
                serde_json::to_string(&fallback).unwrap_or_default()
            }
        }
    }
}

/// Decode one request line
///
/// A line that is not a request yields `INVALID_PARAMETER_VALUE`, along with
/// the id when it can still be recovered.
pub fn decode_request(line: &str) -> Result<Request, (Option<u64>, WireError)> {
    serde_json::from_str::<Request>(line).map_err(|e| {
        let id = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|v| v.get("id").and_then(serde_json::Value::as_u64));
        (
            id,
            WireError {
                code: ErrorCode::InvalidParameterValue,
                message: format!("invalid argument: malformed request: {}", e),
            },
        )
    })
}
