//! Error types for the instrumentation layer
//!
//! None of these errors ever reach the instrumented application: the tracer
//! counts them in [`crate::session::Diagnostics`] and reports them through
//! `tracing`. They are returned directly only from the explicit data-structure
//! APIs (`CallGraph::add_call`, `CallStack::pop`, `EventLog::open`, ...).

use thiserror::Error;

/// Errors produced by the tracing core
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid frame identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("Call stack underflow: expected {expected:?} on top, found {found:?}")]
    Underflow {
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("Clock regression: end {end_us}us precedes start {start_us}us")]
    ClockRegression { start_us: u64, end_us: u64 },

    #[error("Sink unavailable: {target}: {source}")]
    SinkUnavailable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Graph renderer {program:?} failed: {reason}")]
    RenderFailed { program: String, reason: String },
}

impl TraceError {
    pub(crate) fn sink(target: impl Into<String>, source: std::io::Error) -> Self {
        TraceError::SinkUnavailable {
            target: target.into(),
            source,
        }
    }
}

/// Result type for tracing operations
pub type Result<T> = std::result::Result<T, TraceError>;
