//! Queue error types.

/// Errors returned by queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The receipt does not match a live lease: the message was already
    /// settled, or its lease expired and it may have been redelivered.
    #[error("Stale receipt: {receipt}")]
    StaleReceipt { receipt: String },
}
