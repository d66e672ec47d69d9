//! Cross-cutting error types for Quarry.
//!
//! Domain-specific errors (`StoreError`, `QueueError`, ...) live in their
//! respective crates. All of them converge into `anyhow` in `quarry-cli`.

use thiserror::Error;

/// Errors that can be raised by any Quarry crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A storage prefix failed validation.
    #[error("Invalid prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    /// An object key failed validation.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// An event could not be delivered to its sink.
    #[error("Event publish failed: {0}")]
    Publish(String),
}
