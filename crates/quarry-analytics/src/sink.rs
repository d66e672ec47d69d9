//! Observability sinks for analytics results.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use quarry_config::{AnalyticsConfig, SinkKind};
use tokio::sync::Mutex;

use crate::{AnalyticsError, ResultRecord};

/// Append-only destination for result records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn emit(&self, record: &ResultRecord) -> Result<(), AnalyticsError>;
}

/// Build the sink selected by configuration.
#[must_use]
pub fn sink_from_config(config: &AnalyticsConfig) -> Arc<dyn ResultSink> {
    match config.sink {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::Jsonl => Arc::new(JsonlSink::new(&config.sink_path)),
    }
}

/// Emits each record as a structured `tracing` event.
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn emit(&self, record: &ResultRecord) -> Result<(), AnalyticsError> {
        let result = &record.result;
        let json =
            serde_json::to_string(record).map_err(|e| AnalyticsError::Sink(e.to_string()))?;
        let message_id = record
            .message_id
            .map_or_else(|| String::from("manual"), |id| id.to_string());
        tracing::info!(
            message_id = %message_id,
            event_key = record.event_key.as_deref().unwrap_or_default(),
            population_mean = result.population.mean,
            population_std_dev = result.population.std_dev,
            series_analyzed = result.best_years.len(),
            combined_records = result.combined.rows.len(),
            record = %json,
            "analytics result"
        );
        Ok(())
    }
}

/// Appends one JSON line per record to a file.
pub struct JsonlSink {
    path: PathBuf,
    // Serializes appends so concurrent workers never interleave lines.
    lock: Mutex<()>,
}

impl JsonlSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ResultSink for JsonlSink {
    async fn emit(&self, record: &ResultRecord) -> Result<(), AnalyticsError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            serde_jsonlines::append_json_lines(&path, [&record])
        })
        .await
        .map_err(|e| AnalyticsError::Sink(e.to_string()))??;
        Ok(())
    }
}

/// Keeps records in memory (tests and one-shot CLI runs).
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn emit(&self, record: &ResultRecord) -> Result<(), AnalyticsError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
