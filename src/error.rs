//! Error types for the summarization pipeline

use thiserror::Error;

/// Result type alias used throughout the crate
pub type SummarizerResult<T> = Result<T, SummarizerError>;

/// Reason an archive was rejected during ingestion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRejectReason {
    #[error("archive contains {count} entries, exceeding the cap of {max}")]
    TooManyEntries { count: usize, max: usize },

    #[error("archive contains no recognised text files")]
    NoTextFiles,

    #[error("decoded content size {size} exceeds the cap of {max} bytes")]
    ContentTooLarge { size: u64, max: u64 },

    #[error("compression ratio {ratio:.1} exceeds the cap of {max:.1}")]
    SuspiciousRatio { ratio: f64, max: f64 },

    #[error("failed to read archive entry: {0}")]
    ReadFailure(String),
}

/// Main error type for summarization operations
#[derive(Error, Debug)]
pub enum SummarizerError {
    /// Malformed input: missing file, unparsable markdown, bad arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An archive failed one of the ingestion safety checks.
    #[error("archive rejected: {0}")]
    ArchiveRejected(#[from] ArchiveRejectReason),

    /// A component (vector store, retrieval engine) was used before `initialise`.
    #[error("component not initialised: {0}")]
    NotInitialised(String),

    /// An external collaborator (embedding/LLM/vector backend) is unreachable.
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),

    /// An external call exceeded its configured budget.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The job completed but one or more map-phase units failed; the result
    /// still carries whatever succeeded.
    #[error("partial success: {completed}/{total} units completed")]
    PartialSuccess { completed: usize, total: usize },

    /// Cooperative cancellation was observed at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// Wrapped I/O error, e.g. archive reads or log file creation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped zip-archive error.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Wrapped async task join error.
    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Generic internal error for conditions that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SummarizerError {
    /// Whether retrying the same operation could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ExternalUnavailable(_) | Self::Timeout(_) => true,
            Self::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            Self::InvalidInput(_)
            | Self::ArchiveRejected(_)
            | Self::NotInitialised(_)
            | Self::PartialSuccess { .. }
            | Self::Cancelled
            | Self::Json(_)
            | Self::Zip(_)
            | Self::TaskJoin(_)
            | Self::Internal(_) => false,
        }
    }

    /// Category label used in structured log fields and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ArchiveRejected(_) => "archive",
            Self::NotInitialised(_) => "not_initialised",
            Self::ExternalUnavailable(_) => "external_unavailable",
            Self::Timeout(_) => "timeout",
            Self::PartialSuccess { .. } => "partial_success",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "filesystem",
            Self::Json(_) | Self::Zip(_) => "serialization",
            Self::TaskJoin(_) | Self::Internal(_) => "internal",
        }
    }

    /// Process exit code convention used by the demo binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::ArchiveRejected(_) => 2,
            Self::ExternalUnavailable(_) | Self::Timeout(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_unavailable_is_recoverable() {
        let err = SummarizerError::ExternalUnavailable("ollama down".into());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "external_unavailable");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn archive_rejected_is_not_recoverable() {
        let err = SummarizerError::from(ArchiveRejectReason::TooManyEntries { count: 2000, max: 1000 });
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "archive");
        assert_eq!(err.exit_code(), 2);
    }
}
