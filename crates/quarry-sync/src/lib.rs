//! # quarry-sync
//!
//! The fetcher side of the pipeline:
//!
//! - [`WebsiteSync`] mirrors a remote directory index under the website
//!   prefix, downloading only new or changed files and recording what was
//!   synced in `_sync_metadata.json`.
//! - [`ApiSnapshotSync`] stores an immutable timestamped snapshot of a JSON
//!   API and then replaces the dataset's `latest.json` with the same bytes.
//! - [`Fetcher`] runs both concurrently and reports each outcome.
//!
//! Remote access goes through the [`FileSource`] and [`ApiSource`] traits;
//! [`HttpIndexSource`] and [`HttpApiSource`] are the `reqwest` implementations.

pub mod api;
mod error;
pub mod fetcher;
mod http;
pub mod index;
pub mod metadata;
pub mod source;
pub mod website;

pub use api::{ApiOutcome, ApiSnapshotSync, HttpApiSource, SnapshotEnvelope, SnapshotMetadata};
pub use error::SyncError;
pub use fetcher::{DatasetStatus, Fetcher, OperationOutcome, SyncReport, dataset_status};
pub use index::HttpIndexSource;
pub use metadata::{FileRecord, SyncMetadata};
pub use source::{ApiSource, FetchOutcome, FetchedFile, FileSource, RemoteFile, Validators};
pub use website::{WebsiteOutcome, WebsiteSync};
