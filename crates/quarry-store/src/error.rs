//! Store error types.

/// Errors that can occur in the durable store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is not a valid object path.
    #[error("Invalid key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: object_store::path::Error,
    },

    /// No object exists at the key.
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// A create-only write found an existing object.
    #[error("Object already exists: {key}")]
    AlreadyExists { key: String },

    /// Backend operation failed.
    #[error("Object store error: {0}")]
    Backend(#[from] object_store::Error),

    /// I/O error (preparing a local store root).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Map a backend error for `key`, lifting not-found and already-exists.
    pub(crate) fn from_backend(key: &str, error: object_store::Error) -> Self {
        match error {
            object_store::Error::NotFound { .. } => Self::NotFound {
                key: key.to_string(),
            },
            object_store::Error::AlreadyExists { .. } => Self::AlreadyExists {
                key: key.to_string(),
            },
            other => Self::Backend(other),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
