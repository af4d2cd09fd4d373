//! Primitive handles exposed on [`Tracebase`](crate::Tracebase).

mod experiments;
mod traces;

pub use experiments::Experiments;
pub use traces::Traces;
