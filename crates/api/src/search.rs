//! Trace search
//!
//! Filters, orders and pages trace summaries across one or more experiments.
//!
//! ## Paging
//!
//! A page token is opaque to callers: URL-safe base64 over a small JSON
//! document holding the offset of the next page and a fingerprint of the
//! query. Presenting a token with a different query is `InvalidArgument`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracebase_core::{Error, ExperimentId, Result, Trace, TraceInfo, TraceStatus};

/// Page size used when `max_results` is not given
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Largest page size accepted regardless of configuration
pub const MAX_RESULTS_LIMIT: usize = 500;

/// Which traces match
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceFilter {
    /// Only traces with this status
    #[serde(default)]
    pub status: Option<TraceStatus>,
    /// Only traces carrying every one of these tags with the same value
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Inclusive lower bound on `timestamp_ms`
    #[serde(default)]
    pub min_timestamp_ms: Option<u64>,
    /// Exclusive upper bound on `timestamp_ms`
    #[serde(default)]
    pub max_timestamp_ms: Option<u64>,
}

impl TraceFilter {
    /// Filter matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a status
    pub fn status(mut self, status: TraceStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Require a tag value
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Require `min <= timestamp_ms < max`
    pub fn between(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_timestamp_ms = Some(min_ms);
        self.max_timestamp_ms = Some(max_ms);
        self
    }

    /// Whether a trace passes this filter
    pub fn matches(&self, info: &TraceInfo) -> bool {
        if let Some(status) = self.status {
            if info.status != status {
                return false;
            }
        }
        if let Some(min) = self.min_timestamp_ms {
            if info.timestamp_ms < min {
                return false;
            }
        }
        if let Some(max) = self.max_timestamp_ms {
            if info.timestamp_ms >= max {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|(k, v)| info.tags.get(k).map(|have| have == v).unwrap_or(false))
    }
}

/// Result ordering
///
/// Ties on timestamp are broken by trace id in the same direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOrder {
    /// Newest first
    #[default]
    TimestampDesc,
    /// Oldest first
    TimestampAsc,
}

/// A trace search request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTraces {
    /// Experiments to search; at least one
    pub experiment_ids: Vec<ExperimentId>,
    /// Match criteria
    #[serde(default)]
    pub filter: TraceFilter,
    /// Result ordering
    #[serde(default)]
    pub order: TraceOrder,
    /// Page size, `1..=500`, default 100
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Token from a previous page of the same query
    #[serde(default)]
    pub page_token: Option<String>,
}

impl SearchTraces {
    /// Search the given experiments with no filter
    pub fn new<I, E>(experiment_ids: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExperimentId>,
    {
        Self {
            experiment_ids: experiment_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the filter
    pub fn filter(mut self, filter: TraceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the ordering
    pub fn order(mut self, order: TraceOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the page size
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Continue from a previous page
    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    /// Stable hash of everything but the paging fields
    fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.experiment_ids.hash(&mut hasher);
        self.filter.hash(&mut hasher);
        self.order.hash(&mut hasher);
        hasher.finish()
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePage {
    /// Matching trace summaries in the requested order
    pub traces: Vec<TraceInfo>,
    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PageToken {
    offset: usize,
    query: u64,
}

fn encode_token(offset: usize, query: u64) -> Result<String> {
    let json = serde_json::to_vec(&PageToken { offset, query })
        .map_err(|e| Error::service(format!("failed to encode page token: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_token(token: &str, query: u64) -> Result<usize> {
    let invalid = || Error::invalid_argument("invalid page token");
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let parsed: PageToken = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
    if parsed.query != query {
        return Err(Error::invalid_argument(
            "page token was issued for a different query",
        ));
    }
    Ok(parsed.offset)
}

/// Check request parameters; returns the page size
pub(crate) fn validate(request: &SearchTraces, max_allowed: usize) -> Result<usize> {
    if request.experiment_ids.is_empty() {
        return Err(Error::invalid_argument(
            "at least one experiment id must be specified",
        ));
    }
    let limit = max_allowed.clamp(1, MAX_RESULTS_LIMIT);
    let page_size = request.max_results.unwrap_or(DEFAULT_MAX_RESULTS.min(limit));
    if page_size == 0 || page_size > limit {
        return Err(Error::invalid_argument(format!(
            "`max_results` must be between 1 and {}, got {}",
            limit, page_size
        )));
    }
    Ok(page_size)
}

/// Filter, sort and page a trace snapshot
pub(crate) fn run(request: &SearchTraces, page_size: usize, traces: Vec<Trace>) -> Result<TracePage> {
    let query = request.fingerprint();
    let offset = match &request.page_token {
        Some(token) => decode_token(token, query)?,
        None => 0,
    };

    let mut matched: Vec<TraceInfo> = traces
        .into_iter()
        .map(|t| t.info)
        .filter(|info| request.filter.matches(info))
        .collect();
    matched.sort_by(|a, b| {
        (a.timestamp_ms, &a.trace_id).cmp(&(b.timestamp_ms, &b.trace_id))
    });
    if request.order == TraceOrder::TimestampDesc {
        matched.reverse();
    }

    let total = matched.len();
    let page: Vec<TraceInfo> = matched.into_iter().skip(offset).take(page_size).collect();
    let next = offset + page.len();
    let next_page_token = if next < total {
        Some(encode_token(next, query)?)
    } else {
        None
    };

    Ok(TracePage {
        traces: page,
        next_page_token,
    })
}
