//! Durable store configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_root() -> String {
    String::from(".quarry/store")
}

fn default_region() -> String {
    String::from("us-east-1")
}

/// Which object-store implementation backs the durable store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local, lost on exit. Useful for tests and dry runs.
    Memory,
    /// Directory on the local filesystem.
    #[default]
    Local,
    /// S3 or an S3-compatible endpoint.
    S3,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the `local` backend.
    #[serde(default = "default_root")]
    pub root: String,

    /// Bucket name for the `s3` backend.
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint URL (`MinIO`, R2, localstack). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,

    /// Static credentials. When empty, the ambient AWS environment is used.
    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    /// Permit plain-HTTP endpoints.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root: default_root(),
            bucket: String::new(),
            region: default_region(),
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            allow_http: false,
        }
    }
}

impl StoreConfig {
    /// Whether static credentials are present.
    #[must_use]
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            StoreBackend::Memory => Ok(()),
            StoreBackend::Local if self.root.trim().is_empty() => {
                Err(ConfigError::invalid("store.root", "must not be empty"))
            }
            StoreBackend::Local => Ok(()),
            StoreBackend::S3 if self.bucket.trim().is_empty() => Err(ConfigError::NotConfigured {
                section: String::from("store (s3 backend requires store.bucket)"),
            }),
            StoreBackend::S3 => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_local_store() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::Local);
        assert_eq!(config.root, ".quarry/store");
        assert!(!config.has_static_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn s3_requires_bucket() {
        let config = StoreConfig {
            backend: StoreBackend::S3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotConfigured { .. })
        ));

        let config = StoreConfig {
            backend: StoreBackend::S3,
            bucket: "quarry-data".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
