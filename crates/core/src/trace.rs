//! Trace types
//!
//! A [`Trace`] is an immutable record of one application/model invocation.
//! Only its tags and, while `InProgress`, its status/spans may change; the
//! record itself is destroyed irreversibly by trace deletion.

use crate::error::{Error, Result};
use crate::span::{aggregate_token_usage, Span, TokenUsage};
use crate::types::{ExperimentId, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Longest tag key accepted, in bytes
pub const MAX_TAG_KEY_LEN: usize = 250;

/// Check a tag key supplied by a caller
///
/// # Errors
///
/// `InvalidArgument` when the key is empty or longer than [`MAX_TAG_KEY_LEN`].
pub fn validate_tag_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_argument("tag key must not be empty"));
    }
    if key.len() > MAX_TAG_KEY_LEN {
        return Err(Error::invalid_argument(format!(
            "tag key exceeds {} bytes",
            MAX_TAG_KEY_LEN
        )));
    }
    Ok(())
}

/// Outcome of a traced invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    /// Status was not reported
    #[default]
    Unspecified,
    /// Invocation succeeded
    Ok,
    /// Invocation failed
    Error,
    /// Trace was started and not yet ended
    InProgress,
}

impl TraceStatus {
    /// Status name as used on the wire and in filters
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Unspecified => "UNSPECIFIED",
            TraceStatus::Ok => "OK",
            TraceStatus::Error => "ERROR",
            TraceStatus::InProgress => "IN_PROGRESS",
        }
    }

    /// Whether the trace has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceStatus::Ok | TraceStatus::Error)
    }
}

impl FromStr for TraceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UNSPECIFIED" => Ok(TraceStatus::Unspecified),
            "OK" => Ok(TraceStatus::Ok),
            "ERROR" => Ok(TraceStatus::Error),
            "IN_PROGRESS" => Ok(TraceStatus::InProgress),
            other => Err(Error::invalid_argument(format!(
                "unknown trace status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trace metadata, everything except the spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceInfo {
    /// Unique trace id
    pub trace_id: TraceId,
    /// Owning experiment
    pub experiment_id: ExperimentId,
    /// Creation time (milliseconds since epoch)
    pub timestamp_ms: u64,
    /// Wall time of the invocation, once ended
    pub execution_time_ms: Option<u64>,
    /// Outcome
    pub status: TraceStatus,
    /// Immutable request metadata
    pub request_metadata: BTreeMap<String, String>,
    /// Mutable tags
    pub tags: BTreeMap<String, String>,
}

/// A stored trace: metadata plus spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Trace metadata
    pub info: TraceInfo,
    /// Recorded spans, in recording order
    pub spans: Vec<Span>,
}

impl Trace {
    /// Trace id shortcut
    pub fn id(&self) -> &TraceId {
        &self.info.trace_id
    }

    /// Creation time shortcut
    pub fn timestamp_ms(&self) -> u64 {
        self.info.timestamp_ms
    }

    /// Token usage summed over spans
    pub fn token_usage(&self) -> Option<TokenUsage> {
        aggregate_token_usage(&self.spans)
    }
}

/// Parameters for logging a trace
///
/// ```ignore
/// let new = NewTrace::new("1")
///     .at(1_700_000_000_000)
///     .status(TraceStatus::Ok)
///     .tag("model", "gpt");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrace {
    /// Owning experiment
    pub experiment_id: ExperimentId,
    /// Explicit id; generated when `None`
    #[serde(default)]
    pub trace_id: Option<TraceId>,
    /// Creation time; now when `None`
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    /// Wall time of the invocation
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
    /// Outcome
    #[serde(default)]
    pub status: TraceStatus,
    /// Request metadata
    #[serde(default)]
    pub request_metadata: BTreeMap<String, String>,
    /// Tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Spans
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl NewTrace {
    /// Start describing a trace in the given experiment
    pub fn new(experiment_id: impl Into<ExperimentId>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            trace_id: None,
            timestamp_ms: None,
            execution_time_ms: None,
            status: TraceStatus::Ok,
            request_metadata: BTreeMap::new(),
            tags: BTreeMap::new(),
            spans: Vec::new(),
        }
    }

    /// Use an explicit trace id
    pub fn with_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Use an explicit creation time
    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Set the status
    pub fn status(mut self, status: TraceStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the execution time
    pub fn took(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = Some(execution_time_ms);
        self
    }

    /// Add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add request metadata
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_metadata.insert(key.into(), value.into());
        self
    }

    /// Add a span
    pub fn span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}
