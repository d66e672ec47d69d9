//! # quarry-pipeline
//!
//! Runs the pipeline end to end:
//!
//! - [`Scheduler`] fires the fetcher once per day at a fixed UTC time.
//! - Fetcher writes go through the notifying store into the queue.
//! - [`AnalyticsWorkers`] consume the queue, acking on success and nacking
//!   on failure or timeout.
//!
//! [`Service`] assembles all of it from a [`quarry_config::QuarryConfig`].

mod error;
mod schedule;
mod scheduler;
mod service;
mod worker;

pub use error::PipelineError;
pub use schedule::DailySchedule;
pub use scheduler::Scheduler;
pub use service::{Service, ServiceStatus};
pub use worker::{AnalyticsWorkers, Settlement};

use std::future::Future;
use std::time::Duration;

/// Await `future`, failing with [`PipelineError::Timeout`] after `budget`.
pub(crate) async fn within_budget<T>(
    operation: &'static str,
    budget: Duration,
    future: impl Future<Output = T>,
) -> Result<T, PipelineError> {
    tokio::time::timeout(budget, future)
        .await
        .map_err(|_| PipelineError::Timeout { operation, budget })
}
