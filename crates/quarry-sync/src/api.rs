//! API snapshot fetch.
//!
//! Each run stores an immutable `<prefix>/<RFC3339>.json` snapshot and then
//! replaces `<prefix>/latest.json` with the same bytes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use quarry_config::ApiConfig;
use quarry_core::keys;
use quarry_store::NotifyingStore;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SyncError;
use crate::http::{build_client, check_response};
use crate::source::ApiSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub record_count: usize,
}

/// Stored form of an API snapshot: provenance plus the untouched payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub metadata: SnapshotMetadata,
    pub data: Value,
}

impl SnapshotEnvelope {
    #[must_use]
    pub fn new(source: String, fetched_at: DateTime<Utc>, data: Value) -> Self {
        let record_count = data.get("data").and_then(Value::as_array).map_or(0, Vec::len);
        Self {
            metadata: SnapshotMetadata {
                source,
                fetched_at,
                record_count,
            },
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiOutcome {
    pub snapshot_key: String,
    pub latest_key: String,
    pub record_count: usize,
}

/// JSON API queried with fixed parameters.
pub struct HttpApiSource {
    http: reqwest::Client,
    url: Url,
}

impl HttpApiSource {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] for a malformed URL, or
    /// [`SyncError::Http`] if the client cannot be built.
    pub fn new(config: &ApiConfig, user_agent: &str, timeout: Duration) -> Result<Self, SyncError> {
        let url = Url::parse_with_params(&config.url, &config.params).map_err(|e| {
            SyncError::InvalidUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            }
        })?;
        let http = build_client(user_agent, None, timeout)?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl ApiSource for HttpApiSource {
    fn source_url(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Value, SyncError> {
        let resp = check_response(self.http.get(self.url.clone()).send().await?).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SyncError::Parse(format!("API payload: {e}")))
    }
}

pub struct ApiSnapshotSync {
    store: NotifyingStore,
    source: Arc<dyn ApiSource>,
    prefix: String,
}

impl ApiSnapshotSync {
    #[must_use]
    pub fn new(
        store: NotifyingStore,
        source: Arc<dyn ApiSource>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            prefix: prefix.into(),
        }
    }

    /// Fetch once, store the snapshot, then point latest at it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the fetch fails or either write fails. A
    /// snapshot key that already exists (two runs in the same second) is
    /// [`quarry_store::StoreError::AlreadyExists`], and latest is untouched.
    #[tracing::instrument(level = "info", skip(self), fields(prefix = %self.prefix))]
    pub async fn run(&self) -> Result<ApiOutcome, SyncError> {
        let payload = self.source.fetch().await?;
        let fetched_at = Utc::now().trunc_subsecs(0);
        let envelope = SnapshotEnvelope::new(self.source.source_url(), fetched_at, payload);
        let record_count = envelope.metadata.record_count;
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let snapshot_key = keys::snapshot_key(&self.prefix, fetched_at);
        let latest_key = keys::latest_key(&self.prefix);
        self.store.write_new(&snapshot_key, bytes.clone()).await?;
        self.store.write(&latest_key, bytes).await?;

        tracing::info!(snapshot = %snapshot_key, record_count, "API snapshot stored");
        Ok(ApiOutcome {
            snapshot_key,
            latest_key,
            record_count,
        })
    }
}
