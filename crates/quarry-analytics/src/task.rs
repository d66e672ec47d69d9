//! The queue-triggered analytics task.

use std::sync::Arc;

use chrono::Utc;
use quarry_config::AnalyticsConfig;
use quarry_core::{DatasetLayout, QueueMessage, SourceDataset};
use quarry_store::DurableStore;

use crate::input::{parse_population, parse_series};
use crate::reports::{best_years, combined_report, population_stats};
use crate::result::{AnalyticsResult, InputFingerprint, ResultRecord};
use crate::sink::{ResultSink, sink_from_config};
use crate::AnalyticsError;

/// Report parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub population_start_year: i32,
    pub population_end_year: i32,
    pub series_id: String,
    pub period: String,
}

impl From<&AnalyticsConfig> for ReportSettings {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            population_start_year: config.population_start_year,
            population_end_year: config.population_end_year,
            series_id: config.report_series.clone(),
            period: config.report_period.clone(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

/// Recomputes every report from the current latest objects.
///
/// The triggering message is only a wake-up: its body is never read for
/// data, so duplicate or stale deliveries recompute the same result while
/// the latest objects are unchanged.
#[derive(Clone)]
pub struct AnalyticsTask {
    store: DurableStore,
    layout: DatasetLayout,
    settings: ReportSettings,
    sink: Arc<dyn ResultSink>,
}

impl AnalyticsTask {
    #[must_use]
    pub fn new(
        store: DurableStore,
        layout: DatasetLayout,
        settings: ReportSettings,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            store,
            layout,
            settings,
            sink,
        }
    }

    #[must_use]
    pub fn from_config(
        config: &AnalyticsConfig,
        store: DurableStore,
        layout: DatasetLayout,
    ) -> Self {
        Self::new(
            store,
            layout,
            ReportSettings::from(config),
            sink_from_config(config),
        )
    }

    /// Handle one delivery: compute, then emit exactly one record.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if an input is missing or malformed, or the
    /// sink rejects the record. Nothing is emitted on error.
    #[tracing::instrument(
        level = "info",
        skip(self, message),
        fields(
            message_id = %message.id,
            key = %message.body.key,
            receive_count = message.receive_count,
        )
    )]
    pub async fn handle(&self, message: &QueueMessage) -> Result<ResultRecord, AnalyticsError> {
        if message.is_redelivery() {
            tracing::info!("processing redelivered message");
        }
        self.emit(Some(message)).await
    }

    /// Compute and emit outside the queue (CLI `analyze`).
    ///
    /// # Errors
    ///
    /// See [`Self::handle`].
    pub async fn run_once(&self) -> Result<ResultRecord, AnalyticsError> {
        self.emit(None).await
    }

    async fn emit(&self, message: Option<&QueueMessage>) -> Result<ResultRecord, AnalyticsError> {
        let result = self.compute().await?;
        let record = ResultRecord {
            message_id: message.map(|m| m.id),
            event_key: message.map(|m| m.body.key.clone()),
            emitted_at: Utc::now(),
            result,
        };
        self.sink.emit(&record).await?;
        Ok(record)
    }

    /// Read both latest objects and derive every report.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::MissingInput`] or
    /// [`AnalyticsError::MalformedInput`] for unusable inputs.
    pub async fn compute(&self) -> Result<AnalyticsResult, AnalyticsError> {
        let (series_input, population_input) = tokio::try_join!(
            self.load(SourceDataset::WebsiteFileSet),
            self.load(SourceDataset::ApiSnapshot),
        )?;
        let (series_key, series_bytes) = series_input;
        let (population_key, population_bytes) = population_input;

        let table = parse_series(&series_bytes)
            .map_err(|reason| AnalyticsError::malformed(&series_key, reason))?;
        let population = parse_population(&population_bytes)
            .map_err(|reason| AnalyticsError::malformed(&population_key, reason))?;

        let settings = &self.settings;
        let result = AnalyticsResult {
            inputs: vec![
                InputFingerprint::of(SourceDataset::WebsiteFileSet, &series_key, &series_bytes),
                InputFingerprint::of(
                    SourceDataset::ApiSnapshot,
                    &population_key,
                    &population_bytes,
                ),
            ],
            skipped_rows: table.skipped,
            population: population_stats(
                &population,
                settings.population_start_year,
                settings.population_end_year,
            ),
            best_years: best_years(&table.rows),
            combined: combined_report(
                &table.rows,
                &population,
                &settings.series_id,
                &settings.period,
            ),
        };
        tracing::debug!(
            rows = table.rows.len(),
            skipped = table.skipped,
            population_records = population.len(),
            "analytics computed"
        );
        Ok(result)
    }

    async fn load(&self, dataset: SourceDataset) -> Result<(String, Vec<u8>), AnalyticsError> {
        let key = self.layout.latest_key(dataset);
        match self.store.read_optional(&key).await? {
            Some(object) => Ok((key, object.bytes)),
            None => Err(AnalyticsError::MissingInput { key }),
        }
    }
}
