//! # quarry-core
//!
//! Core types shared across all Quarry crates.
//!
//! This crate provides the foundational pieces of the pipeline:
//! - `SourceDataset` and the startup-validated `DatasetLayout` that maps each
//!   dataset to its storage prefix
//! - Object key helpers (timestamped snapshot keys, latest keys)
//! - `ChangeEvent` and the `EventSink` seam used by the notification fan-out
//! - `QueueMessage` envelope with message ids
//! - Cross-cutting error types

pub mod dataset;
pub mod errors;
pub mod events;
pub mod keys;
pub mod message;

pub use dataset::{DatasetLayout, SourceDataset};
pub use errors::CoreError;
pub use events::{ChangeEvent, EventSink};
pub use message::{MessageId, QueueMessage};
