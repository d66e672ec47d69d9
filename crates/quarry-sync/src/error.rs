//! Sync error types.

use quarry_core::CoreError;
use quarry_store::StoreError;

/// Errors that can occur while syncing a source dataset.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the remote.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The remote returned 429 Too Many Requests.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A remote payload or stored document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A configured URL is malformed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Key construction or validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
