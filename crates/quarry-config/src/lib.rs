//! # quarry-config
//!
//! Layered configuration loading for Quarry using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`QUARRY_*` prefix, `__` as separator)
//! 2. An explicit config file passed by the caller (`--config`)
//! 3. Project-level `.quarry/config.toml`
//! 4. User-level `~/.config/quarry/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `QUARRY_STORE__BACKEND` -> `store.backend`,
//! `QUARRY_SCHEDULE__HOUR` -> `schedule.hour`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use quarry_config::QuarryConfig;
//!
//! let config = QuarryConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! let layout = config.layout().expect("layout");
//! ```

mod analytics;
mod datasets;
mod error;
mod notifications;
mod queue;
mod schedule;
mod store;

pub use analytics::{AnalyticsConfig, SinkKind};
pub use datasets::{ApiConfig, DatasetsConfig, WebsiteConfig};
pub use error::ConfigError;
pub use notifications::{NotificationRule, NotificationsConfig};
pub use queue::{MAX_PERIOD_SECS, QueueConfig};
pub use schedule::{ScheduleConfig, SyncConfig};
pub use store::{StoreBackend, StoreConfig};

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use quarry_core::DatasetLayout;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuarryConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub datasets: DatasetsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl QuarryConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `explicit` above the discovered files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] if `explicit` does not exist and
    /// [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(ConfigError::NotConfigured {
                section: format!("config file {}", path.display()),
            });
        }
        Self::figment(explicit).extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// See [`Self::load_from`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".quarry/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Explicit file
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 4: Environment variables (highest priority)
        figment.merge(Env::prefixed("QUARRY_").split("__"))
    }

    /// Check every section. Run once at startup, before any task is built.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.datasets.validate()?;
        self.notifications.validate()?;
        self.schedule.validate()?;
        self.sync.validate()?;
        self.queue.validate()?;
        self.analytics.validate()?;
        let layout = self.layout()?;
        self.notifications.validate_against(&layout)?;
        Ok(())
    }

    /// Dataset layout derived from the configured prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Layout`] if a prefix is malformed or prefixes overlap.
    pub fn layout(&self) -> Result<DatasetLayout, ConfigError> {
        DatasetLayout::new(
            self.datasets.website.prefix.clone(),
            self.datasets.api.prefix.clone(),
            self.datasets.website.primary_file.clone(),
        )
        .map_err(ConfigError::from)
    }

    /// Notification rules in effect, with the default derived from the
    /// configured API prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Layout`] if the dataset layout is invalid.
    pub fn notification_rules(&self) -> Result<Vec<NotificationRule>, ConfigError> {
        Ok(self.notifications.effective_rules(&self.layout()?))
    }

    /// Copy with credentials blanked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.store.secret_access_key.is_empty() {
            copy.store.secret_access_key = String::from("***");
        }
        copy
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("quarry").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QuarryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert!(config.notifications.rules.is_empty());
        assert_eq!(
            config.notification_rules().unwrap(),
            vec![NotificationRule {
                prefix: "api-data/".into(),
                suffix: Some(".json".into()),
            }]
        );
    }

    #[test]
    fn moved_api_prefix_keeps_default_rule_aligned() {
        let mut config = QuarryConfig::default();
        config.datasets.api.prefix = "snapshots".into();
        assert!(config.validate().is_ok());
        assert_eq!(config.notification_rules().unwrap()[0].prefix, "snapshots/");
    }

    #[test]
    fn rule_outside_datasets_fails_validation() {
        let mut config = QuarryConfig::default();
        config.notifications.rules = vec![
            NotificationRule {
                prefix: "api-data/".into(),
                suffix: Some(".json".into()),
            },
            NotificationRule {
                prefix: "scratch/".into(),
                suffix: None,
            },
        ];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "notifications.rules.prefix"
        ));
    }

    #[test]
    fn figment_builds_without_files() {
        let config: QuarryConfig = QuarryConfig::figment(None)
            .extract()
            .expect("should extract defaults");
        assert_eq!(config.schedule.hour, 2);
        assert_eq!(config.queue.max_receive_count, 3);
    }

    #[test]
    fn overlapping_prefixes_fail_validation() {
        let mut config = QuarryConfig::default();
        config.datasets.api.prefix = config.datasets.website.prefix.clone();
        assert!(matches!(config.validate(), Err(ConfigError::Layout(_))));
    }

    #[test]
    fn redacted_hides_secret() {
        let mut config = QuarryConfig::default();
        config.store.secret_access_key = "hunter2".into();
        assert_eq!(config.redacted().store.secret_access_key, "***");
        assert_eq!(config.store.secret_access_key, "hunter2");
    }
}
