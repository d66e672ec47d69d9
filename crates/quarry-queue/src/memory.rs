//! In-memory queue implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use quarry_config::QueueConfig;
use quarry_core::{ChangeEvent, CoreError, EventSink, MessageId, QueueMessage};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::{DeadLetter, Delivery, QueueError, QueueStats, ReceiptHandle};

struct Lease {
    receipt: ReceiptHandle,
    expires_at: Instant,
}

struct Entry {
    message: QueueMessage,
    seq: u64,
    enqueued: Instant,
    visible_at: Instant,
    lease: Option<Lease>,
}

impl Entry {
    fn is_ready(&self, now: Instant) -> bool {
        self.lease.is_none() && self.visible_at <= now
    }

    /// Next instant at which this entry could become deliverable.
    fn wakes_at(&self) -> Instant {
        self.lease
            .as_ref()
            .map_or(self.visible_at, |lease| lease.expires_at)
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<MessageId, Entry>,
    dead: Vec<DeadLetter>,
    next_seq: u64,
}

impl State {
    fn insert(&mut self, message: QueueMessage, now: Instant) -> MessageId {
        let id = message.id;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            Entry {
                message,
                seq,
                enqueued: now,
                visible_at: now,
                lease: None,
            },
        );
        id
    }

    fn dead_letter(&mut self, id: MessageId) {
        if let Some(entry) = self.entries.remove(&id) {
            tracing::warn!(
                message_id = %id,
                key = %entry.message.body.key,
                receive_count = entry.message.receive_count,
                "message moved to dead-letter list"
            );
            self.dead.push(DeadLetter {
                message: entry.message,
                dead_at: Utc::now(),
            });
        }
    }

    /// Expire leases, drop messages past retention, and dead-letter messages
    /// that have used up their deliveries.
    fn sweep(&mut self, now: Instant, config: &QueueConfig) {
        let retention = config.retention();
        let mut expired = Vec::new();
        let mut exhausted = Vec::new();

        for (id, entry) in &mut self.entries {
            if now.duration_since(entry.enqueued) >= retention {
                expired.push(*id);
                continue;
            }
            if let Some(lease) = &entry.lease
                && lease.expires_at <= now
            {
                tracing::debug!(message_id = %id, "lease expired");
                entry.visible_at = lease.expires_at;
                entry.lease = None;
            }
            if entry.lease.is_none() && entry.message.receive_count >= config.max_receive_count {
                exhausted.push(*id);
            }
        }

        for id in expired {
            self.entries.remove(&id);
            tracing::warn!(message_id = %id, "message dropped after retention period");
        }
        for id in exhausted {
            self.dead_letter(id);
        }
    }

    fn leased_mut(
        &mut self,
        receipt: ReceiptHandle,
        now: Instant,
    ) -> Result<&mut Entry, QueueError> {
        self.entries
            .values_mut()
            .find(|entry| {
                entry
                    .lease
                    .as_ref()
                    .is_some_and(|lease| lease.receipt == receipt && lease.expires_at > now)
            })
            .ok_or_else(|| QueueError::StaleReceipt {
                receipt: receipt.to_string(),
            })
    }
}

/// Process-local queue shared by the store fan-out (producer) and the
/// analytics workers (consumers). Wrap in an `Arc` to share.
pub struct MemoryQueue {
    config: QueueConfig,
    state: Mutex<State>,
    available: Notify,
}

impl MemoryQueue {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            available: Notify::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Enqueue a change event.
    pub async fn send(&self, event: ChangeEvent) -> MessageId {
        let message = QueueMessage::new(event);
        let id = {
            let mut state = self.state.lock().await;
            state.insert(message, Instant::now())
        };
        tracing::debug!(message_id = %id, "message enqueued");
        self.available.notify_waiters();
        id
    }

    /// Lease the oldest visible message, if any.
    pub async fn receive(&self) -> Option<Delivery> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.sweep(now, &self.config);

        let entry = state
            .entries
            .values_mut()
            .filter(|entry| entry.is_ready(now))
            .min_by_key(|entry| entry.seq)?;

        let receipt = ReceiptHandle::new();
        entry.message.receive_count += 1;
        entry.lease = Some(Lease {
            receipt,
            expires_at: later(now, self.config.visibility_timeout()),
        });
        tracing::debug!(
            message_id = %entry.message.id,
            receive_count = entry.message.receive_count,
            "message leased"
        );
        Some(Delivery {
            message: entry.message.clone(),
            receipt,
        })
    }

    /// Wait up to `wait` for a message to become available.
    pub async fn receive_wait(&self, wait: Duration) -> Option<Delivery> {
        let deadline = later(Instant::now(), wait);
        loop {
            // Registered before checking so a concurrent send cannot be missed.
            let notified = self.available.notified();
            if let Some(delivery) = self.receive().await {
                return Some(delivery);
            }
            if Instant::now() >= deadline {
                return None;
            }
            let wake_at = self
                .next_wake()
                .await
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn next_wake(&self) -> Option<Instant> {
        let now = Instant::now();
        let state = self.state.lock().await;
        state
            .entries
            .values()
            .map(Entry::wakes_at)
            .filter(|at| *at > now)
            .min()
    }

    /// Settle a delivery successfully, removing the message.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::StaleReceipt`] if the lease is no longer held.
    pub async fn ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let id = state.leased_mut(receipt, now)?.message.id;
        state.entries.remove(&id);
        tracing::debug!(message_id = %id, "message acknowledged");
        Ok(())
    }

    /// Settle a delivery as failed. The message becomes visible again after
    /// backoff, or is dead-lettered once it has used all its deliveries.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::StaleReceipt`] if the lease is no longer held.
    pub async fn nack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let entry = state.leased_mut(receipt, now)?;
        let id = entry.message.id;
        let receive_count = entry.message.receive_count;

        if receive_count >= self.config.max_receive_count {
            state.dead_letter(id);
            return Ok(());
        }

        let delay = backoff(&self.config, receive_count);
        entry.lease = None;
        entry.visible_at = later(now, delay);
        drop(state);

        tracing::debug!(
            message_id = %id,
            receive_count,
            delay_secs = delay.as_secs(),
            "message returned with backoff"
        );
        self.available.notify_waiters();
        Ok(())
    }

    pub async fn stats(&self) -> QueueStats {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.sweep(now, &self.config);

        let mut stats = QueueStats {
            dead: state.dead.len(),
            ..QueueStats::default()
        };
        for entry in state.entries.values() {
            if entry.lease.is_some() {
                stats.in_flight += 1;
            } else if entry.visible_at <= now {
                stats.ready += 1;
            } else {
                stats.delayed += 1;
            }
        }
        stats
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead.clone()
    }

    /// Move every dead letter back to the ready queue with a fresh receive
    /// count. Returns the number of messages moved.
    pub async fn redrive(&self) -> usize {
        let now = Instant::now();
        let moved = {
            let mut state = self.state.lock().await;
            let dead = std::mem::take(&mut state.dead);
            let moved = dead.len();
            for letter in dead {
                let mut message = letter.message;
                message.receive_count = 0;
                state.insert(message, now);
            }
            moved
        };
        if moved > 0 {
            tracing::info!(moved, "dead letters redriven");
            self.available.notify_waiters();
        }
        moved
    }
}

#[async_trait]
impl EventSink for MemoryQueue {
    async fn publish(&self, event: ChangeEvent) -> Result<(), CoreError> {
        self.send(event).await;
        Ok(())
    }
}

/// About thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, with `delay` clamped to [`FAR_FUTURE`] so the sum never
/// overflows.
fn later(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(FAR_FUTURE)).unwrap_or(now)
}

/// Delay before a nacked message is visible again:
/// `base * 2^(receive_count - 1)`, capped at `max`.
fn backoff(config: &QueueConfig, receive_count: u32) -> Duration {
    let factor = 2u32.saturating_pow(receive_count.saturating_sub(1));
    config
        .backoff_base()
        .saturating_mul(factor)
        .min(config.backoff_max())
}
