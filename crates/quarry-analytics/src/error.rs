//! Analytics error types.

use quarry_store::StoreError;

/// Errors that fail an analytics invocation.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A dataset's latest object does not exist yet.
    #[error("input missing: {key}")]
    MissingInput { key: String },

    /// A dataset's latest object exists but cannot be interpreted.
    #[error("input malformed ({key}): {reason}")]
    MalformedInput { key: String, reason: String },

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The result could not be delivered to the sink.
    #[error("result sink error: {0}")]
    Sink(String),

    /// I/O error (JSONL sink).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
