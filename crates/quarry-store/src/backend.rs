//! Backend selection from configuration.

use std::sync::Arc;

use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use quarry_config::{StoreBackend, StoreConfig};

use crate::StoreError;

/// Build the configured object store.
///
/// The `local` backend creates its root directory if needed. The `s3` backend
/// starts from the ambient `AWS_*` environment and layers configured values
/// on top.
pub(crate) fn open(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemory::new())),
        StoreBackend::Local => {
            std::fs::create_dir_all(&config.root)?;
            Ok(Arc::new(LocalFileSystem::new_with_prefix(&config.root)?))
        }
        StoreBackend::S3 => {
            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(&config.bucket)
                .with_region(&config.region)
                .with_allow_http(config.allow_http);
            if !config.endpoint.is_empty() {
                builder = builder.with_endpoint(&config.endpoint);
            }
            if config.has_static_credentials() {
                builder = builder
                    .with_access_key_id(&config.access_key_id)
                    .with_secret_access_key(&config.secret_access_key);
            }
            Ok(Arc::new(builder.build()?))
        }
    }
}
