//! # quarry-queue
//!
//! In-process work queue between the store fan-out and the analytics task.
//!
//! Delivery is at-least-once with no ordering guarantee:
//!
//! - a received message is leased for the visibility timeout; if it is not
//!   acknowledged in time it becomes visible again,
//! - `nack` makes it visible again after exponential backoff,
//! - after `max_receive_count` deliveries it moves to the dead-letter list,
//! - messages older than the retention period are dropped.
//!
//! Each delivery carries a fresh [`ReceiptHandle`]; settling with a receipt
//! whose lease has lapsed fails with [`QueueError::StaleReceipt`].

pub mod error;
mod memory;

pub use error::QueueError;
pub use memory::MemoryQueue;

use std::fmt;

use chrono::{DateTime, Utc};
use quarry_core::QueueMessage;
use serde::Serialize;
use uuid::Uuid;

/// Proof of a single delivery, required to ack or nack it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(Uuid);

impl ReceiptHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt-{}", self.0.simple())
    }
}

/// A message handed to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: QueueMessage,
    pub receipt: ReceiptHandle,
}

/// A message that exhausted its deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub message: QueueMessage,
    pub dead_at: DateTime<Utc>,
}

/// Point-in-time queue depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Visible and waiting for a consumer.
    pub ready: usize,
    /// Leased to a consumer.
    pub in_flight: usize,
    /// Waiting out a nack backoff.
    pub delayed: usize,
    pub dead: usize,
}

impl QueueStats {
    /// Messages still awaiting a successful delivery.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.ready + self.in_flight + self.delayed
    }
}
