//! The scheduled fetcher: both sync operations, run concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quarry_config::QuarryConfig;
use quarry_core::{DatasetLayout, SourceDataset};
use quarry_store::{DurableStore, NotifyingStore};
use serde::Serialize;

use crate::api::{ApiOutcome, ApiSnapshotSync, HttpApiSource, SnapshotEnvelope};
use crate::index::HttpIndexSource;
use crate::metadata::SyncMetadata;
use crate::source::{ApiSource, FileSource};
use crate::website::{WebsiteOutcome, WebsiteSync};
use crate::SyncError;

/// Outcome of one sync operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome<T> {
    Succeeded(T),
    Failed { error: String },
}

impl<T> OperationOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    fn from_result(result: Result<T, SyncError>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(error) => Self::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Per-operation results of a fetcher run. `None` means not requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub website: Option<OperationOutcome<WebsiteOutcome>>,
    pub api: Option<OperationOutcome<ApiOutcome>>,
}

impl SyncReport {
    /// Whether every requested operation succeeded. Individual file failures
    /// inside a successful website run do not count.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.website.as_ref().is_none_or(OperationOutcome::is_success)
            && self.api.as_ref().is_none_or(OperationOutcome::is_success)
    }
}

/// Freshness of one dataset, as recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub dataset: SourceDataset,
    pub prefix: String,
    pub latest_key: String,
    pub latest_present: bool,
    pub last_synced: Option<DateTime<Utc>>,
    pub objects: usize,
}

pub struct Fetcher {
    website: WebsiteSync,
    api: ApiSnapshotSync,
}

impl Fetcher {
    #[must_use]
    pub fn new(
        store: &NotifyingStore,
        layout: &DatasetLayout,
        files: Arc<dyn FileSource>,
        api: Arc<dyn ApiSource>,
    ) -> Self {
        Self {
            website: WebsiteSync::new(
                store.clone(),
                files,
                layout.prefix(SourceDataset::WebsiteFileSet),
            ),
            api: ApiSnapshotSync::new(
                store.clone(),
                api,
                layout.prefix(SourceDataset::ApiSnapshot),
            ),
        }
    }

    /// Fetcher backed by the configured HTTP sources.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if a URL is malformed or an HTTP client cannot
    /// be built. The layout is expected to have been validated already.
    pub fn from_config(
        config: &QuarryConfig,
        store: &NotifyingStore,
        layout: &DatasetLayout,
    ) -> Result<Self, SyncError> {
        let timeout = config.sync.http_timeout();
        let files = HttpIndexSource::new(&config.datasets.website, timeout)?;
        let api = HttpApiSource::new(
            &config.datasets.api,
            &config.datasets.website.user_agent,
            timeout,
        )?;
        Ok(Self::new(store, layout, Arc::new(files), Arc::new(api)))
    }

    /// Run both operations.
    pub async fn run(&self) -> SyncReport {
        self.run_only(None).await
    }

    /// Run one operation, or both when `only` is `None`. The operations
    /// touch disjoint prefixes and run concurrently; one failing never
    /// stops the other.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run_only(&self, only: Option<SourceDataset>) -> SyncReport {
        let wants = |dataset| only.is_none_or(|only| only == dataset);
        let started_at = Utc::now();

        let website = async {
            if wants(SourceDataset::WebsiteFileSet) {
                Some(OperationOutcome::from_result(self.website.run().await))
            } else {
                None
            }
        };
        let api = async {
            if wants(SourceDataset::ApiSnapshot) {
                Some(OperationOutcome::from_result(self.api.run().await))
            } else {
                None
            }
        };
        let (website, api) = tokio::join!(website, api);

        if let Some(OperationOutcome::Failed { error }) = &website {
            tracing::error!(%error, "website sync failed");
        }
        if let Some(OperationOutcome::Failed { error }) = &api {
            tracing::error!(%error, "API snapshot fetch failed");
        }

        SyncReport {
            started_at,
            finished_at: Utc::now(),
            website,
            api,
        }
    }
}

/// Freshness of both datasets in `layout`, read from `store`.
///
/// Website freshness comes from the sync metadata; API freshness from the
/// latest snapshot's envelope.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the store cannot be read.
pub async fn dataset_status(
    store: &DurableStore,
    layout: &DatasetLayout,
) -> Result<Vec<DatasetStatus>, SyncError> {
    let mut statuses = Vec::with_capacity(SourceDataset::ALL.len());
    for dataset in SourceDataset::ALL {
        let prefix = layout.prefix(dataset).to_string();
        let latest_key = layout.latest_key(dataset);
        let latest_present = store.head(&latest_key).await?.is_some();
        let objects = store.list(&prefix).await?.len();

        let last_synced = match dataset {
            SourceDataset::WebsiteFileSet => {
                SyncMetadata::load(store, &layout.sync_metadata_key())
                    .await?
                    .last_sync
            }
            SourceDataset::ApiSnapshot => store
                .read_optional(&latest_key)
                .await?
                .and_then(|object| serde_json::from_slice::<SnapshotEnvelope>(&object.bytes).ok())
                .map(|envelope| envelope.metadata.fetched_at),
        };

        statuses.push(DatasetStatus {
            dataset,
            prefix,
            latest_key,
            latest_present,
            last_synced,
            objects,
        });
    }
    Ok(statuses)
}
