//! Convenient imports for Tracebase.
//!
//! ```ignore
//! use tracebase::prelude::*;
//!
//! let db = Tracebase::ephemeral()?;
//! db.traces.log(NewTrace::new("0"))?;
//! ```

// Main entry point
pub use crate::database::{Tracebase, TracebaseBuilder};

// Error handling
pub use crate::{Error, Result};

// Primitives
pub use crate::primitives::{Experiments, Traces};

// Core types
pub use crate::types::{
    DeleteTracesRequest, ExperimentId, NewTrace, Span, TraceId, TraceStatus,
};

// Search and purge
pub use crate::types::{BatchPurge, PurgeReport, SearchTraces, TraceFilter, TraceOrder};

// Access control
pub use crate::types::Permission;

// Span attributes are JSON
pub use serde_json::json;
