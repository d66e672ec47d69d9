//! Wiring of store, queue, fetcher, and analytics into one service.

use std::sync::Arc;

use quarry_analytics::{AnalyticsTask, ReportSettings, ResultRecord, ResultSink, sink_from_config};
use quarry_config::QuarryConfig;
use quarry_core::{DatasetLayout, SourceDataset};
use quarry_queue::{MemoryQueue, QueueStats};
use quarry_store::{DurableStore, NotifyingStore};
use quarry_sync::{
    ApiSource, DatasetStatus, Fetcher, FileSource, SyncError, SyncReport, dataset_status,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{AnalyticsWorkers, DailySchedule, PipelineError, Scheduler, Settlement, within_budget};

/// Dataset freshness plus queue depth.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub datasets: Vec<DatasetStatus>,
    pub queue: QueueStats,
}

/// The assembled pipeline.
///
/// Writes go through a [`NotifyingStore`] whose sink is the queue, so every
/// matching snapshot write enqueues one analytics trigger.
pub struct Service {
    config: QuarryConfig,
    store: DurableStore,
    layout: DatasetLayout,
    queue: Arc<MemoryQueue>,
    fetcher: Arc<Fetcher>,
    analytics: AnalyticsTask,
}

impl Service {
    /// Build the service from validated configuration, with HTTP sources and
    /// the configured store backend and result sink.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if configuration is invalid or the store or
    /// HTTP clients cannot be built.
    pub fn from_config(config: QuarryConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = DurableStore::from_config(&config.store)?;
        let sink = sink_from_config(&config.analytics);
        Self::assemble(config, store, sink, Fetcher::from_config)
    }

    /// Build the service around caller-supplied parts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if configuration is invalid.
    pub fn with_parts(
        config: QuarryConfig,
        store: DurableStore,
        files: Arc<dyn FileSource>,
        api: Arc<dyn ApiSource>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Self::assemble(config, store, sink, |_, notifying, layout| {
            Ok(Fetcher::new(notifying, layout, files, api))
        })
    }

    fn assemble(
        config: QuarryConfig,
        store: DurableStore,
        sink: Arc<dyn ResultSink>,
        fetcher: impl FnOnce(
            &QuarryConfig,
            &NotifyingStore,
            &DatasetLayout,
        ) -> Result<Fetcher, SyncError>,
    ) -> Result<Self, PipelineError> {
        let layout = config.layout()?;
        let queue = Arc::new(MemoryQueue::new(config.queue.clone()));
        let rules = config.notification_rules()?;
        let notifying =
            NotifyingStore::new(store.clone(), queue.clone(), rules).with_layout(layout.clone());
        let fetcher = Arc::new(fetcher(&config, &notifying, &layout)?);
        let analytics = AnalyticsTask::new(
            store.clone(),
            layout.clone(),
            ReportSettings::from(&config.analytics),
            sink,
        );
        Ok(Self {
            config,
            store,
            layout,
            queue,
            fetcher,
            analytics,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &QuarryConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &DurableStore {
        &self.store
    }

    #[must_use]
    pub const fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    #[must_use]
    pub fn queue(&self) -> Arc<MemoryQueue> {
        Arc::clone(&self.queue)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the schedule is invalid.
    pub fn scheduler(&self) -> Result<Scheduler, PipelineError> {
        Ok(Scheduler::new(
            Arc::clone(&self.fetcher),
            DailySchedule::from_config(&self.config.schedule)?,
            self.config.sync.timeout(),
        ))
    }

    #[must_use]
    pub fn workers(&self) -> AnalyticsWorkers {
        AnalyticsWorkers::new(self.queue(), self.analytics.clone(), &self.config.analytics)
    }

    /// Run the scheduler (when enabled) and the analytics workers until
    /// `cancel` is triggered.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the schedule is invalid.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), PipelineError> {
        let scheduler = if self.config.schedule.enabled {
            Some(self.scheduler()?)
        } else {
            tracing::info!("scheduler disabled, running analytics workers only");
            None
        };
        let workers = self.workers();

        let schedule = async {
            if let Some(scheduler) = &scheduler {
                scheduler.run(cancel.clone()).await;
            }
        };
        tokio::join!(schedule, workers.run(cancel.clone()));
        Ok(())
    }

    /// One budgeted fetcher run, for all datasets or just `only`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Timeout`] if the run exceeds `sync.timeout_secs`.
    pub async fn sync(&self, only: Option<SourceDataset>) -> Result<SyncReport, PipelineError> {
        within_budget("sync", self.config.sync.timeout(), self.fetcher.run_only(only)).await
    }

    /// Process the messages currently waiting in the queue.
    pub async fn drain_queue(&self) -> Vec<Settlement> {
        self.workers().drain().await
    }

    /// One budgeted analytics run outside the queue.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Analytics`] if an input is missing or
    /// malformed and [`PipelineError::Timeout`] if the run overruns.
    pub async fn analyze(&self) -> Result<ResultRecord, PipelineError> {
        let budget = self.config.analytics.timeout();
        let record = within_budget("analytics", budget, self.analytics.run_once()).await??;
        Ok(record)
    }

    /// Triggers not yet acknowledged. The queue lives in this process, so
    /// these are lost when it exits.
    pub async fn pending_triggers(&self) -> usize {
        self.queue.stats().await.pending()
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Sync`] if the store cannot be read.
    pub async fn status(&self) -> Result<ServiceStatus, PipelineError> {
        Ok(ServiceStatus {
            datasets: dataset_status(&self.store, &self.layout).await?,
            queue: self.queue.stats().await,
        })
    }
}
