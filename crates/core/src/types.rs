//! Identifier types
//!
//! - [`ExperimentId`]: decimal string identifying an experiment (`"0"` is the default)
//! - [`TraceId`]: unique trace identifier, `tr-{uuid}` when generated

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest identifier accepted from callers, in bytes
pub const MAX_ID_LEN: usize = 256;

/// Current wall-clock time in milliseconds since the epoch
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Identifier of an experiment
///
/// Experiment ids are allocated by the engine as increasing decimal strings.
/// Callers may refer to any string; unknown ids resolve to `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create an experiment id from any string
    pub fn new(id: impl Into<String>) -> Self {
        ExperimentId(id.into())
    }

    /// The default experiment, created the first time a database is opened
    pub fn default_experiment() -> Self {
        ExperimentId("0".to_string())
    }

    /// Experiment id for the n-th allocated experiment
    pub fn from_index(index: u64) -> Self {
        ExperimentId(index.to_string())
    }

    /// Numeric index of this id, if it was engine-allocated
    pub fn index(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a caller-supplied experiment id
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the id is empty or longer than [`MAX_ID_LEN`].
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::invalid_argument("experiment_id must be specified"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(Error::invalid_argument(format!(
                "experiment_id exceeds {} bytes",
                MAX_ID_LEN
            )));
        }
        Ok(ExperimentId(raw.to_string()))
    }
}

impl From<&str> for ExperimentId {
    fn from(s: &str) -> Self {
        ExperimentId::new(s)
    }
}

impl From<String> for ExperimentId {
    fn from(s: String) -> Self {
        ExperimentId(s)
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a trace
///
/// Generated ids have the form `tr-{32 hex digits}`. Caller-supplied ids
/// are accepted when non-empty, at most [`MAX_ID_LEN`] bytes, and free of
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh random trace id
    pub fn generate() -> Self {
        TraceId(format!("tr-{}", Uuid::new_v4().simple()))
    }

    /// Validate and wrap a caller-supplied trace id
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the id is empty, too long, or contains whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::invalid_argument("trace id must not be empty"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(Error::invalid_argument(format!(
                "trace id exceeds {} bytes",
                MAX_ID_LEN
            )));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(Error::invalid_argument(format!(
                "trace id '{}' contains whitespace",
                raw
            )));
        }
        Ok(TraceId(raw.to_string()))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TraceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TraceId::parse(s)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
