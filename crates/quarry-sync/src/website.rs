//! Website file-set sync.
//!
//! Mirrors every file listed by a [`FileSource`] under the website prefix and
//! records what was synced in a [`SyncMetadata`] document. A file is only
//! downloaded when the listing, the conditional request, and finally the
//! content hash all say it may have changed.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use quarry_core::keys;
use quarry_store::NotifyingStore;
use serde::Serialize;

use crate::SyncError;
use crate::metadata::{FileRecord, SyncMetadata, content_hash};
use crate::source::{FetchOutcome, FileSource, RemoteFile};

/// Result of one website sync run. File names are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebsiteOutcome {
    pub listed: usize,
    /// Bodies transferred, including ones found identical by hash.
    ///
    /// A file listed without a fingerprint and served without an `ETag` or
    /// `Last-Modified` cannot be checked before transfer, so it is
    /// downloaded on every run. Its stored copy and metadata are only
    /// rewritten when the content hash changes.
    pub downloaded: usize,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    /// Whether the metadata document was rewritten.
    pub metadata_written: bool,
}

impl WebsiteOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }
}

enum FileSync {
    /// Body unchanged; the record may carry refreshed validators.
    Unchanged(FileRecord),
    Written(FileRecord),
}

pub struct WebsiteSync {
    store: NotifyingStore,
    source: Arc<dyn FileSource>,
    prefix: String,
    metadata_key: String,
}

impl WebsiteSync {
    #[must_use]
    pub fn new(
        store: NotifyingStore,
        source: Arc<dyn FileSource>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        let metadata_key = keys::sync_metadata_key(&prefix);
        Self {
            store,
            source,
            prefix,
            metadata_key,
        }
    }

    #[must_use]
    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// Sync once.
    ///
    /// A listing failure fails the whole run. Individual file failures are
    /// reported in [`WebsiteOutcome::failed`] and keep their previous
    /// metadata entry (or stay absent).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the listing or the metadata document cannot
    /// be read or written.
    #[tracing::instrument(level = "info", skip(self), fields(prefix = %self.prefix))]
    pub async fn run(&self) -> Result<WebsiteOutcome, SyncError> {
        let listing = self.source.list().await?;
        let previous = SyncMetadata::load(self.store.store(), &self.metadata_key).await?;
        let mut next = previous.clone();
        let mut outcome = WebsiteOutcome {
            listed: listing.len(),
            ..WebsiteOutcome::default()
        };

        for file in &listing {
            let prior = previous.files.get(&file.name);
            match self.sync_file(file, prior, &mut outcome).await {
                Ok(FileSync::Unchanged(record)) => {
                    outcome.unchanged += 1;
                    next.files.insert(file.name.clone(), record);
                }
                Ok(FileSync::Written(record)) => {
                    if prior.is_some() {
                        outcome.updated.push(file.name.clone());
                    } else {
                        outcome.added.push(file.name.clone());
                    }
                    next.files.insert(file.name.clone(), record);
                }
                Err(error) => {
                    tracing::warn!(file = %file.name, %error, "file sync failed");
                    outcome.failed.push(file.name.clone());
                }
            }
        }

        let listed: BTreeSet<&str> = listing.iter().map(|f| f.name.as_str()).collect();
        let removed: Vec<String> = previous
            .files
            .keys()
            .filter(|name| !listed.contains(name.as_str()))
            .cloned()
            .collect();
        for name in removed {
            match self.store.delete(&keys::join(&self.prefix, &name)).await {
                Ok(()) => {
                    tracing::info!(file = %name, "removed file deleted");
                    next.files.remove(&name);
                    outcome.deleted.push(name);
                }
                Err(error) => {
                    tracing::warn!(file = %name, %error, "failed to delete removed file");
                    outcome.failed.push(name);
                }
            }
        }

        if outcome.changed() {
            next.last_sync = Some(Utc::now());
        }
        if next != previous {
            self.store
                .write(&self.metadata_key, next.to_bytes()?)
                .await?;
            outcome.metadata_written = true;
        }

        outcome.added.sort();
        outcome.updated.sort();
        outcome.deleted.sort();
        outcome.failed.sort();
        tracing::info!(
            listed = outcome.listed,
            downloaded = outcome.downloaded,
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            deleted = outcome.deleted.len(),
            failed = outcome.failed.len(),
            "website sync finished"
        );
        Ok(outcome)
    }

    async fn sync_file(
        &self,
        file: &RemoteFile,
        prior: Option<&FileRecord>,
        outcome: &mut WebsiteOutcome,
    ) -> Result<FileSync, SyncError> {
        keys::validate_name(&file.name)?;
        if file.name == keys::SYNC_METADATA_NAME {
            return Err(SyncError::Parse(format!(
                "upstream file name '{}' is reserved",
                file.name
            )));
        }

        if let Some(prior) = prior
            && file.fingerprint.is_some()
            && prior.fingerprint == file.fingerprint
        {
            return Ok(FileSync::Unchanged(prior.clone()));
        }

        let validators = prior.map(FileRecord::validators).unwrap_or_default();
        match self.source.fetch(file, &validators).await? {
            FetchOutcome::NotModified => {
                let Some(prior) = prior else {
                    return Err(SyncError::Parse(format!(
                        "'{}' answered not-modified to an unconditional request",
                        file.name
                    )));
                };
                let mut record = prior.clone();
                record.fingerprint.clone_from(&file.fingerprint);
                Ok(FileSync::Unchanged(record))
            }
            FetchOutcome::Content(fetched) => {
                outcome.downloaded += 1;
                if let Some(prior) = prior
                    && prior.content_hash == content_hash(&fetched.bytes)
                {
                    let mut record = prior.clone();
                    record.fingerprint.clone_from(&file.fingerprint);
                    record.etag = fetched.validators.etag;
                    record.last_modified = fetched.validators.last_modified;
                    return Ok(FileSync::Unchanged(record));
                }

                let record = FileRecord::new(file, &fetched.bytes, fetched.validators);
                self.store
                    .write(&keys::join(&self.prefix, &file.name), fetched.bytes)
                    .await?;
                tracing::info!(file = %file.name, size = record.size, "file mirrored");
                Ok(FileSync::Written(record))
            }
        }
    }
}
