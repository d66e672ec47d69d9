//! The daily sync trigger.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use quarry_sync::{Fetcher, SyncReport};
use tokio_util::sync::CancellationToken;

use crate::{DailySchedule, PipelineError, within_budget};

/// Fires the fetcher once per day with no input.
///
/// Each fire is independent: a run that fails or overruns its budget is
/// logged and the scheduler simply waits for the next fire time. Runs are
/// never retried.
pub struct Scheduler {
    fetcher: Arc<Fetcher>,
    schedule: DailySchedule,
    budget: Duration,
}

impl Scheduler {
    #[must_use]
    pub const fn new(fetcher: Arc<Fetcher>, schedule: DailySchedule, budget: Duration) -> Self {
        Self {
            fetcher,
            schedule,
            budget,
        }
    }

    #[must_use]
    pub const fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Run one budgeted sync now.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Timeout`] if the run exceeds its budget.
    pub async fn run_once(&self) -> Result<SyncReport, PipelineError> {
        within_budget("sync", self.budget, self.fetcher.run()).await
    }

    /// Fire at every scheduled time until `cancel` is triggered.
    ///
    /// The next fire time is always computed from the current time, so a
    /// long pause never produces a burst of catch-up runs.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(schedule = %self.schedule, "scheduler started");
        loop {
            let now = Utc::now();
            let next = self.schedule.next_after(now);
            tracing::debug!(next = %next, "next sync scheduled");

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("scheduler cancelled");
                    return;
                }
                () = tokio::time::sleep(self.schedule.delay_from(now)) => {}
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("scheduler cancelled during a sync run");
                    return;
                }
                outcome = self.run_once() => log_outcome(&outcome),
            }
        }
    }
}

fn log_outcome(outcome: &Result<SyncReport, PipelineError>) {
    match outcome {
        Ok(report) if report.is_success() => tracing::info!("scheduled sync finished"),
        Ok(_) => tracing::warn!("scheduled sync finished with failures"),
        Err(error) => tracing::error!(%error, "scheduled sync failed"),
    }
}
