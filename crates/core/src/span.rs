//! Spans recorded inside a trace
//!
//! A trace carries a flat list of spans. Parent links are by span id.
//! Span ids are 64-bit integers rendered as 16 lowercase hex digits.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Add;

/// Attribute holding token usage for chat-model spans
pub const CHAT_USAGE_ATTRIBUTE: &str = "chat.usage";

/// Render a span id as 16 zero-padded lowercase hex digits
pub fn encode_span_id(span_id: u64) -> String {
    format!("{:016x}", span_id)
}

fn decode_span_id(raw: &str) -> Option<u64> {
    if raw.len() != 16 {
        return None;
    }
    u64::from_str_radix(raw, 16).ok()
}

mod span_id_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_span_id(*id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        super::decode_span_id(&raw).ok_or_else(|| D::Error::custom(format!("bad span id '{}'", raw)))
    }
}

mod opt_span_id_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => s.serialize_some(&super::encode_span_id(*id)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::decode_span_id(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("bad span id '{}'", raw))),
            None => Ok(None),
        }
    }
}

/// One timed operation inside a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Span id, unique within its trace
    #[serde(with = "span_id_hex")]
    pub span_id: u64,
    /// Parent span, `None` for the root
    #[serde(with = "opt_span_id_hex")]
    pub parent_id: Option<u64>,
    /// Operation name
    pub name: String,
    /// Start time in nanoseconds since epoch
    pub start_time_ns: u64,
    /// End time in nanoseconds since epoch, `None` while running
    pub end_time_ns: Option<u64>,
    /// Arbitrary JSON attributes
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Span {
    /// Create a root span with no attributes
    pub fn new(span_id: u64, name: impl Into<String>, start_time_ns: u64) -> Self {
        Self {
            span_id,
            parent_id: None,
            name: name.into(),
            start_time_ns,
            end_time_ns: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the parent span
    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the end time
    pub fn ended_at(mut self, end_time_ns: u64) -> Self {
        self.end_time_ns = Some(end_time_ns);
        self
    }

    /// Set one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Hex-encoded span id
    pub fn encoded_id(&self) -> String {
        encode_span_id(self.span_id)
    }

    /// Token usage recorded on this span, if any
    pub fn token_usage(&self) -> Option<TokenUsage> {
        let usage = self.attributes.get(CHAT_USAGE_ATTRIBUTE)?.as_object()?;
        let field = |key: &str| usage.get(key).and_then(serde_json::Value::as_u64).unwrap_or(0);
        Some(TokenUsage {
            input_tokens: field("input_tokens"),
            output_tokens: field("output_tokens"),
            total_tokens: field("total_tokens"),
        })
    }
}

/// Make span names unique within a trace
///
/// Names occurring more than once get `_1`, `_2`, … suffixes in span order.
/// Unique names and the order of spans are left untouched.
pub fn deduplicate_span_names(spans: &mut [Span]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for span in spans.iter() {
        *counts.entry(span.name.clone()).or_insert(0) += 1;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for span in spans.iter_mut() {
        if counts.get(&span.name).copied().unwrap_or(0) > 1 {
            let n = seen.entry(span.name.clone()).or_insert(0);
            *n += 1;
            span.name = format!("{}_{}", span.name, n);
        }
    }
}

/// Token counts summed over chat-model spans
///
/// Sums saturate at `u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Prompt plus completion tokens
    pub total_tokens: u64,
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

/// Sum token usage over all spans that report it
///
/// Returns `None` when no span carries usage. Missing counters count as zero.
pub fn aggregate_token_usage(spans: &[Span]) -> Option<TokenUsage> {
    spans
        .iter()
        .filter_map(Span::token_usage)
        .reduce(|acc, usage| acc + usage)
}
