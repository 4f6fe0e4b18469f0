//! Structured tracing spans for the summarization pipeline.
//!
//! Logging configuration and subscriber initialisation live in
//! [`crate::config`]; this module only carries the span-naming
//! convention used across components.

/// Re-export commonly used tracing items
pub use tracing::{debug, error, info, instrument, trace, warn, Instrument, Span};

/// Span for archive ingestion operations.
#[macro_export]
macro_rules! archive_span {
    ($operation:expr) => {
        tracing::info_span!("archive_operation", operation = $operation, component = "archive")
    };
    ($operation:expr, $($field:expr),+ $(,)?) => {
        tracing::info_span!("archive_operation", operation = $operation, component = "archive", $($field),+)
    };
}

/// Span for retrieval operations (BM25, dense, RRF fusion).
#[macro_export]
macro_rules! retrieval_span {
    ($operation:expr) => {
        tracing::info_span!("retrieval_operation", operation = $operation, component = "retrieval")
    };
    ($operation:expr, $($field:expr),+ $(,)?) => {
        tracing::info_span!("retrieval_operation", operation = $operation, component = "retrieval", $($field),+)
    };
}

/// Span for hierarchical summarisation phases.
#[macro_export]
macro_rules! summarizer_span {
    ($operation:expr) => {
        tracing::info_span!("summarizer_operation", operation = $operation, component = "summarizer")
    };
    ($operation:expr, $($field:expr),+ $(,)?) => {
        tracing::info_span!("summarizer_operation", operation = $operation, component = "summarizer", $($field),+)
    };
}

/// Logs an error with its category and originating component.
pub fn log_error_with_context<E: std::fmt::Display>(error: E, context: &str, component: &str) {
    tracing::error!(
        error = %error,
        context = context,
        component = component,
        "operation failed"
    );
}
