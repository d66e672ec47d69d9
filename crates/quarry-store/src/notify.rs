//! Store-write notification fan-out.
//!
//! [`NotifyingStore`] wraps a [`DurableStore`] and publishes one
//! [`ChangeEvent`] for every successful write whose key matches a configured
//! [`NotificationRule`]. Events are published only after the write returns,
//! so a consumer that re-reads the key sees the written bytes (or newer).
//! A publish failure is logged and never fails the write itself.

use std::sync::Arc;

use quarry_config::NotificationRule;
use quarry_core::{ChangeEvent, DatasetLayout, EventSink};

use crate::{DurableStore, ObjectInfo, StoreError};

#[derive(Clone)]
pub struct NotifyingStore {
    store: DurableStore,
    sink: Arc<dyn EventSink>,
    rules: Vec<NotificationRule>,
    layout: Option<DatasetLayout>,
}

impl NotifyingStore {
    #[must_use]
    pub fn new(
        store: DurableStore,
        sink: Arc<dyn EventSink>,
        rules: Vec<NotificationRule>,
    ) -> Self {
        Self {
            store,
            sink,
            rules,
            layout: None,
        }
    }

    /// Tag emitted events with the dataset that owns the written key.
    #[must_use]
    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The undecorated store, for reads and listings.
    #[must_use]
    pub const fn store(&self) -> &DurableStore {
        &self.store
    }

    /// Whether a write at `key` produces an event.
    #[must_use]
    pub fn is_monitored(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(key))
    }

    /// Overwriting write, followed by notification.
    ///
    /// # Errors
    ///
    /// Returns the store error; notification errors are only logged.
    pub async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<ObjectInfo, StoreError> {
        let info = self.store.write(key, bytes).await?;
        self.notify(&info).await;
        Ok(info)
    }

    /// Create-only write, followed by notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the key is taken.
    pub async fn write_new(&self, key: &str, bytes: Vec<u8>) -> Result<ObjectInfo, StoreError> {
        let info = self.store.write_new(key, bytes).await?;
        self.notify(&info).await;
        Ok(info)
    }

    /// Deletes are not notified.
    ///
    /// # Errors
    ///
    /// Returns any backend error other than not-found.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await
    }

    async fn notify(&self, info: &ObjectInfo) {
        if !self.is_monitored(&info.key) {
            return;
        }
        let dataset = self
            .layout
            .as_ref()
            .and_then(|layout| layout.dataset_for_key(&info.key));
        let event = ChangeEvent::new(info.key.clone(), dataset, info.size);
        match self.sink.publish(event).await {
            Ok(()) => tracing::debug!(key = %info.key, "change event published"),
            Err(error) => {
                tracing::warn!(key = %info.key, %error, "failed to publish change event");
            }
        }
    }
}

impl std::fmt::Debug for NotifyingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyingStore")
            .field("store", &self.store)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
