//! Core types for Tracebase
//!
//! This crate defines the fundamental types shared by every layer:
//! - [`ExperimentId`] and [`TraceId`]: identifiers
//! - [`Trace`], [`TraceInfo`], [`Span`]: recorded executions
//! - [`ChatMessage`], [`ChatTool`]: chat-model span attributes
//! - [`Experiment`]: the container that owns traces
//! - [`DeleteTracesRequest`]: the deletion value object and its validation
//! - [`Error`]: the canonical error taxonomy with wire codes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chat;
pub mod error;
pub mod experiment;
pub mod request;
pub mod span;
pub mod trace;
pub mod types;

pub use chat::{
    parse_chat_messages, parse_chat_tools, ChatMessage, ChatTool, FunctionCall,
    FunctionDefinition, ToolCall, ToolType, CHAT_MESSAGES_ATTRIBUTE, CHAT_TOOLS_ATTRIBUTE,
};
pub use error::{Error, ErrorCode, Result, WireError};
pub use experiment::{Experiment, LifecycleStage, DEFAULT_EXPERIMENT_NAME};
pub use request::{DeleteTracesRequest, TraceSelection, ValidatedDeletion};
pub use span::{
    aggregate_token_usage, deduplicate_span_names, encode_span_id, Span, TokenUsage,
    CHAT_USAGE_ATTRIBUTE,
};
pub use trace::{validate_tag_key, NewTrace, Trace, TraceInfo, TraceStatus};
pub use types::{now_millis, ExperimentId, TraceId};
