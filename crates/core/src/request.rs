//! Trace deletion request
//!
//! [`DeleteTracesRequest`] is the loosely-typed value object that arrives
//! from callers (Rust API, wire, CLI). [`DeleteTracesRequest::validate`]
//! turns it into a [`ValidatedDeletion`] whose [`TraceSelection`] can only
//! express the legal combinations:
//!
//! | Combination | Valid? |
//! |---|---|
//! | `max_timestamp_millis` only | yes |
//! | `max_timestamp_millis` + `max_traces` | yes |
//! | `trace_ids` only | yes |
//! | `trace_ids` + `max_traces` | no |
//! | neither specified | no |
//! | both `max_timestamp_millis` and `trace_ids` | no |

use crate::error::{Error, Result};
use crate::types::{ExperimentId, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroU64;

/// Request to delete traces from one experiment
///
/// Integers are signed so that out-of-range values coming off the wire are
/// reported as `InvalidArgument` instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteTracesRequest {
    /// Owning experiment (required)
    pub experiment_id: String,
    /// Delete traces created strictly before this time (ms since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timestamp_millis: Option<i64>,
    /// Delete exactly these traces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_ids: Option<Vec<String>>,
    /// Cap on traces deleted by this call (cutoff form only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_traces: Option<i64>,
}

impl DeleteTracesRequest {
    /// Select every trace created before `max_timestamp_millis`
    pub fn older_than(experiment_id: impl Into<String>, max_timestamp_millis: i64) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            max_timestamp_millis: Some(max_timestamp_millis),
            ..Default::default()
        }
    }

    /// Select an explicit list of traces
    pub fn by_ids<I, S>(experiment_id: impl Into<String>, trace_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            experiment_id: experiment_id.into(),
            trace_ids: Some(trace_ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Cap the number of traces deleted by this call
    pub fn with_max_traces(mut self, max_traces: i64) -> Self {
        self.max_traces = Some(max_traces);
        self
    }

    /// Check the parameter contract and produce a typed selection
    ///
    /// Performs no store access. An empty `trace_ids` list is treated as
    /// absent. Duplicate ids are collapsed, first occurrence wins.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for every contract violation listed in the module docs,
    /// a blank experiment id, a negative cutoff, a non-positive cap, or a
    /// malformed trace id.
    pub fn validate(&self) -> Result<ValidatedDeletion> {
        let experiment_id = ExperimentId::parse(&self.experiment_id)?;
        let trace_ids = self.trace_ids.as_ref().filter(|ids| !ids.is_empty());

        let selection = match (self.max_timestamp_millis, trace_ids) {
            (None, None) => {
                return Err(Error::invalid_argument(
                    "either `max_timestamp_millis` or `trace_ids` must be specified",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::invalid_argument(
                    "only one of `max_timestamp_millis` and `trace_ids` can be specified",
                ))
            }
            (None, Some(ids)) => {
                if self.max_traces.is_some() {
                    return Err(Error::invalid_argument(
                        "`max_traces` can't be specified if `trace_ids` is specified",
                    ));
                }
                let mut seen = HashSet::with_capacity(ids.len());
                let mut parsed = Vec::with_capacity(ids.len());
                for raw in ids {
                    let id = TraceId::parse(raw)?;
                    if seen.insert(id.clone()) {
                        parsed.push(id);
                    }
                }
                TraceSelection::ByIds(parsed)
            }
            (Some(cutoff), None) => {
                if cutoff < 0 {
                    return Err(Error::invalid_argument(format!(
                        "`max_timestamp_millis` must be non-negative, got {}",
                        cutoff
                    )));
                }
                let limit = match self.max_traces {
                    None => None,
                    Some(n) if n <= 0 => {
                        return Err(Error::invalid_argument(format!(
                            "`max_traces` must be a positive integer, got {}",
                            n
                        )))
                    }
                    Some(n) => NonZeroU64::new(n as u64),
                };
                TraceSelection::OlderThan {
                    cutoff_ms: cutoff as u64,
                    limit,
                }
            }
        };

        Ok(ValidatedDeletion {
            experiment_id,
            selection,
        })
    }
}

/// Which traces of an experiment a deletion targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSelection {
    /// Traces with `timestamp_ms < cutoff_ms`, oldest first, at most `limit`
    OlderThan {
        /// Exclusive upper bound on creation time
        cutoff_ms: u64,
        /// Optional cap on the number of traces selected
        limit: Option<NonZeroU64>,
    },
    /// Exactly these traces, when they belong to the experiment
    ByIds(Vec<TraceId>),
}

impl TraceSelection {
    /// Upper bound on the number of traces this selection can match
    pub fn limit(&self) -> Option<u64> {
        match self {
            TraceSelection::OlderThan { limit, .. } => limit.map(NonZeroU64::get),
            TraceSelection::ByIds(ids) => Some(ids.len() as u64),
        }
    }
}

/// A deletion request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDeletion {
    /// Owning experiment
    pub experiment_id: ExperimentId,
    /// Selection criteria
    pub selection: TraceSelection,
}
