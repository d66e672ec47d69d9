//! Website sync metadata document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quarry_store::DurableStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::SyncError;
use crate::source::{RemoteFile, Validators};

/// What was last synced for one upstream file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub url: String,
    /// Hex SHA-256 of the stored bytes.
    pub content_hash: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub size: u64,
    pub synced_at: DateTime<Utc>,
}

impl FileRecord {
    #[must_use]
    pub fn new(file: &RemoteFile, bytes: &[u8], validators: Validators) -> Self {
        Self {
            url: file.url.clone(),
            content_hash: content_hash(bytes),
            fingerprint: file.fingerprint.clone(),
            etag: validators.etag,
            last_modified: validators.last_modified,
            size: bytes.len() as u64,
            synced_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn validators(&self) -> Validators {
        Validators {
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

/// Files currently mirrored, keyed by upstream name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
    /// Last run that changed anything.
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncMetadata {
    /// Load the document at `key`. A missing document is empty; an unreadable
    /// one is logged and treated as empty so the next run resyncs everything.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the store cannot be read.
    pub async fn load(store: &DurableStore, key: &str) -> Result<Self, SyncError> {
        let Some(object) = store.read_optional(key).await? else {
            tracing::info!(key, "no sync metadata found, starting fresh");
            return Ok(Self::default());
        };
        match serde_json::from_slice(&object.bytes) {
            Ok(metadata) => Ok(metadata),
            Err(error) => {
                tracing::warn!(key, %error, "sync metadata unreadable, starting fresh");
                Ok(Self::default())
            }
        }
    }

    /// Pretty JSON, stable across runs for equal documents.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Json`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Hex SHA-256 of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn missing_or_corrupt_metadata_loads_empty() {
        let store = DurableStore::in_memory();
        let key = "bls-data/_sync_metadata.json";
        assert_eq!(SyncMetadata::load(&store, key).await.unwrap(), SyncMetadata::default());

        store.write(key, b"not json".to_vec()).await.unwrap();
        assert_eq!(SyncMetadata::load(&store, key).await.unwrap(), SyncMetadata::default());
    }

    #[tokio::test]
    async fn metadata_reloads_identically() {
        let store = DurableStore::in_memory();
        let key = "bls-data/_sync_metadata.json";
        let file = RemoteFile {
            name: "pr.class".into(),
            url: "https://download.bls.gov/pub/time.series/pr/pr.class".into(),
            fingerprint: Some("3/19/2025 8:30 AM 1472".into()),
        };
        let mut metadata = SyncMetadata::default();
        metadata
            .files
            .insert(file.name.clone(), FileRecord::new(&file, b"class", Validators::default()));
        metadata.last_sync = Some(Utc::now());

        store.write(key, metadata.to_bytes().unwrap()).await.unwrap();
        assert_eq!(SyncMetadata::load(&store, key).await.unwrap(), metadata);
    }
}
