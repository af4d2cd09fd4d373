//! Public types re-exported from the internal crates.

// Identifiers and records
pub use tracebase_core::{
    DeleteTracesRequest, Experiment, ExperimentId, LifecycleStage, NewTrace, Span, TokenUsage,
    Trace, TraceId, TraceInfo, TraceStatus,
};

// Chat-model span attributes
pub use tracebase_core::{ChatMessage, ChatTool, FunctionCall, FunctionDefinition, ToolCall, ToolType};

// Search and purge
pub use tracebase_api::{BatchPurge, PurgeReport, SearchTraces, TraceFilter, TraceOrder, TracePage};

// Access control
pub use tracebase_security::{Permission, Principal};

// Engine settings and counters
pub use tracebase_engine::{DatabaseInfo, DurabilityMode};
