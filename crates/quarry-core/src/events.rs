//! Change events emitted by the store fan-out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, SourceDataset};

/// Notification that an object was created or replaced under a monitored prefix.
///
/// Consumers treat the event as a trigger only; they re-read current state
/// from the store instead of trusting the event body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Key of the written object.
    pub key: String,
    /// Dataset owning the key, when the key is under a dataset prefix.
    pub dataset: Option<SourceDataset>,
    /// Size of the written object in bytes.
    pub size: u64,
    /// When the notification was produced (after the write was durable).
    pub notified_at: DateTime<Utc>,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(key: impl Into<String>, dataset: Option<SourceDataset>, size: u64) -> Self {
        Self {
            key: key.into(),
            dataset,
            size,
            notified_at: Utc::now(),
        }
    }
}

/// Destination for change events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Publish`] when the event could not be accepted.
    async fn publish(&self, event: ChangeEvent) -> Result<(), CoreError>;
}
