//! # quarry-store
//!
//! Durable key-value storage for the Quarry pipeline, built on the
//! `object_store` crate.
//!
//! ## Guarantees
//!
//! - `write` is atomic per key: readers see the previous bytes or the new
//!   bytes, never a mix. Every backend provides this (`InMemory` swaps under a
//!   lock, `LocalFileSystem` writes a staging file and renames, S3 `PUT`).
//! - `write_new` is create-only and fails with [`StoreError::AlreadyExists`]
//!   instead of replacing an immutable snapshot.
//! - `list` is prefix-scoped and returns keys in lexical order.
//!
//! Write notifications are layered on top by [`NotifyingStore`].

mod backend;
pub mod error;
pub mod notify;

pub use error::StoreError;
pub use notify::NotifyingStore;

use std::path::Path as FsPath;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use object_store::{
    ObjectStore, PutMode, PutPayload, local::LocalFileSystem, memory::InMemory, path::Path,
};
use quarry_config::StoreConfig;
use serde::Serialize;

/// An object read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Prefix-namespaced object store shared by all pipeline tasks.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct DurableStore {
    inner: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("backend", &self.inner.to_string())
            .finish()
    }
}

impl DurableStore {
    #[must_use]
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Process-local store (for tests and dry runs).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Store rooted at a local directory, created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn local(root: &FsPath) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        Ok(Self::new(Arc::new(LocalFileSystem::new_with_prefix(root)?)))
    }

    /// Open the backend selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be built.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        backend::open(config).map(Self::new)
    }

    /// Write `bytes` at `key`, replacing any previous object atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] or a backend error.
    pub async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<ObjectInfo, StoreError> {
        self.put(key, bytes, PutMode::Overwrite).await
    }

    /// Write `bytes` at `key` only if no object exists there yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the key is taken.
    pub async fn write_new(&self, key: &str, bytes: Vec<u8>) -> Result<ObjectInfo, StoreError> {
        self.put(key, bytes, PutMode::Create).await
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        mode: PutMode,
    ) -> Result<ObjectInfo, StoreError> {
        let path = parse_key(key)?;
        let size = bytes.len() as u64;
        self.inner
            .put_opts(&path, PutPayload::from(bytes), mode.into())
            .await
            .map_err(|e| StoreError::from_backend(key, e))?;
        tracing::debug!(key, size, "object written");
        Ok(ObjectInfo {
            key: key.to_string(),
            size,
            last_modified: Utc::now(),
        })
    }

    /// Read the most recent bytes written at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing exists at `key`.
    pub async fn read(&self, key: &str) -> Result<StoredObject, StoreError> {
        let path = parse_key(key)?;
        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| StoreError::from_backend(key, e))?;
        let last_modified = result.meta.last_modified;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| StoreError::from_backend(key, e))?;
        Ok(StoredObject {
            key: key.to_string(),
            bytes: bytes.to_vec(),
            last_modified,
        })
    }

    /// Like [`Self::read`], but a missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any error other than not-found.
    pub async fn read_optional(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        match self.read(key).await {
            Ok(object) => Ok(Some(object)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Metadata for `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns any error other than not-found.
    pub async fn head(&self, key: &str) -> Result<Option<ObjectInfo>, StoreError> {
        let path = parse_key(key)?;
        match self.inner.head(&path).await {
            Ok(meta) => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: object_size(meta.size),
                last_modified: meta.last_modified,
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(other) => Err(StoreError::from_backend(key, other)),
        }
    }

    /// All objects under `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] or a backend error.
    pub async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let path = parse_key(prefix)?;
        let metas: Vec<_> = self
            .inner
            .list(Some(&path))
            .try_collect()
            .await
            .map_err(|e| StoreError::from_backend(prefix, e))?;

        let mut objects: Vec<ObjectInfo> = metas
            .into_iter()
            .map(|meta| ObjectInfo {
                key: meta.location.to_string(),
                size: object_size(meta.size),
                last_modified: meta.last_modified,
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns any backend error other than not-found.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = parse_key(key)?;
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(other) => Err(StoreError::from_backend(key, other)),
        }
    }
}

#[allow(clippy::useless_conversion)]
fn object_size<T: TryInto<u64>>(size: T) -> u64 {
    size.try_into().unwrap_or(u64::MAX)
}

fn parse_key(key: &str) -> Result<Path, StoreError> {
    Path::parse(key).map_err(|source| StoreError::InvalidKey {
        key: key.to_string(),
        source,
    })
}
