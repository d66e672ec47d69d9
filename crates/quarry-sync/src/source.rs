//! Remote source seams.
//!
//! The sync tasks talk to the outside world only through these traits, so
//! tests drive them with in-process fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::SyncError;

/// One file advertised by a remote index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Upstream file name (final path segment), used as the storage name.
    pub name: String,
    pub url: String,
    /// Listing details that change when the file does (date and size
    /// columns of a directory index). `None` when the listing has none.
    pub fingerprint: Option<String>,
}

/// HTTP validators from the last successful download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// A downloaded file body and the validators that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub validators: Validators,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The remote confirmed the previous copy is current.
    NotModified,
    Content(FetchedFile),
}

/// A remote directory of files.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Files currently listed upstream.
    async fn list(&self) -> Result<Vec<RemoteFile>, SyncError>;

    /// Download `file`, conditionally on `validators` when they are set.
    async fn fetch(
        &self,
        file: &RemoteFile,
        validators: &Validators,
    ) -> Result<FetchOutcome, SyncError>;
}

/// A remote JSON API.
#[async_trait]
pub trait ApiSource: Send + Sync {
    /// Identifier recorded in snapshot metadata.
    fn source_url(&self) -> String;

    async fn fetch(&self) -> Result<Value, SyncError>;
}
