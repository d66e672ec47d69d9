//! Queue consumers running the analytics task.

use std::sync::Arc;
use std::time::Duration;

use quarry_analytics::AnalyticsTask;
use quarry_config::AnalyticsConfig;
use quarry_queue::{Delivery, MemoryQueue};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::within_budget;

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Acked,
    Nacked,
}

/// A pool of analytics consumers sharing one queue.
#[derive(Clone)]
pub struct AnalyticsWorkers {
    queue: Arc<MemoryQueue>,
    task: AnalyticsTask,
    workers: usize,
    budget: Duration,
    receive_wait: Duration,
}

impl AnalyticsWorkers {
    #[must_use]
    pub fn new(queue: Arc<MemoryQueue>, task: AnalyticsTask, config: &AnalyticsConfig) -> Self {
        Self {
            queue,
            task,
            workers: config.workers.max(1),
            budget: config.timeout(),
            receive_wait: config.receive_wait(),
        }
    }

    /// Run `workers` consumers until `cancel` is triggered. A delivery
    /// already being processed is settled before its worker exits.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut set = JoinSet::new();
        for worker in 0..self.workers {
            let this = self.clone();
            let cancel = cancel.clone();
            set.spawn(async move { this.consume(worker, cancel).await });
        }
        tracing::info!(workers = self.workers, "analytics workers started");

        while let Some(joined) = set.join_next().await {
            if let Err(error) = joined {
                tracing::error!(%error, "analytics worker panicked");
            }
        }
        tracing::info!("analytics workers stopped");
    }

    async fn consume(&self, worker: usize, cancel: CancellationToken) {
        loop {
            let delivery = tokio::select! {
                () = cancel.cancelled() => break,
                delivery = self.queue.receive_wait(self.receive_wait) => delivery,
            };
            if let Some(delivery) = delivery {
                tracing::debug!(worker, message_id = %delivery.message.id, "delivery received");
                self.process(delivery).await;
            }
        }
    }

    /// Process every currently visible message, then return.
    ///
    /// Nacked messages wait out their backoff and are not picked up again
    /// by the same drain.
    pub async fn drain(&self) -> Vec<Settlement> {
        let mut settled = Vec::new();
        while let Some(delivery) = self.queue.receive().await {
            settled.push(self.process(delivery).await);
        }
        settled
    }

    /// Run the analytics task for one delivery within its budget, then
    /// ack on success or nack on failure or timeout.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(message_id = %delivery.message.id, receipt = %delivery.receipt)
    )]
    pub async fn process(&self, delivery: Delivery) -> Settlement {
        let outcome =
            within_budget("analytics", self.budget, self.task.handle(&delivery.message)).await;
        let (settlement, settled) = match outcome {
            Ok(Ok(_)) => (Settlement::Acked, self.queue.ack(delivery.receipt).await),
            Ok(Err(error)) => {
                tracing::warn!(%error, "analytics failed, message will be redelivered");
                (Settlement::Nacked, self.queue.nack(delivery.receipt).await)
            }
            Err(error) => {
                tracing::warn!(%error, "analytics cancelled");
                (Settlement::Nacked, self.queue.nack(delivery.receipt).await)
            }
        };
        if let Err(error) = settled {
            tracing::warn!(%error, "delivery could not be settled");
        }
        settlement
    }
}
