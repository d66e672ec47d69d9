//! Pipeline error types.

use std::time::Duration;

use quarry_analytics::AnalyticsError;
use quarry_config::ConfigError;
use quarry_store::StoreError;
use quarry_sync::SyncError;

/// Errors surfaced by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// An invocation ran past its time budget and was cancelled.
    #[error("{operation} exceeded its {}s budget", .budget.as_secs())]
    Timeout {
        operation: &'static str,
        budget: Duration,
    },
}
