//! Queue message envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ChangeEvent;

/// Stable identifier of a queued message, shared by all of its deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0.simple())
    }
}

/// A change event travelling through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: MessageId,
    pub body: ChangeEvent,
    /// Number of times this message has been handed to a consumer,
    /// including the current delivery.
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    #[must_use]
    pub fn new(body: ChangeEvent) -> Self {
        Self {
            id: MessageId::new(),
            body,
            receive_count: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// Whether this delivery is a redelivery of an earlier attempt.
    #[must_use]
    pub const fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique_and_prefixed() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("msg-"));
    }

    #[test]
    fn body_round_trips_through_json() {
        let message = QueueMessage::new(ChangeEvent::new("api-data/latest.json", None, 42));
        let json = serde_json::to_string(&message).unwrap();
        let back: QueueMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
        assert!(!back.is_redelivery());
    }
}
