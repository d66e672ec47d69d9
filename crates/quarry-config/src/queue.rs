//! Processing queue policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Longest accepted lease, backoff, or retention period (14 days).
pub const MAX_PERIOD_SECS: u64 = 14 * 24 * 60 * 60;

const fn default_visibility_timeout_secs() -> u64 {
    15 * 60
}

const fn default_max_receive_count() -> u32 {
    3
}

const fn default_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_backoff_base_secs() -> u64 {
    5
}

const fn default_backoff_max_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Lease length: an unacknowledged delivery becomes visible again after this.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Deliveries allowed before a message is dead-lettered.
    #[serde(default = "default_max_receive_count")]
    pub max_receive_count: u32,

    /// Messages older than this are dropped.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Delay before a nacked message is visible again, doubled per receive.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: default_visibility_timeout_secs(),
            max_receive_count: default_max_receive_count(),
            retention_secs: default_retention_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    #[must_use]
    pub const fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    #[must_use]
    pub const fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.visibility_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "queue.visibility_timeout_secs",
                "must be > 0",
            ));
        }
        if self.max_receive_count == 0 {
            return Err(ConfigError::invalid("queue.max_receive_count", "must be > 0"));
        }
        if self.retention_secs == 0 {
            return Err(ConfigError::invalid("queue.retention_secs", "must be > 0"));
        }
        for (field, secs) in [
            ("queue.visibility_timeout_secs", self.visibility_timeout_secs),
            ("queue.retention_secs", self.retention_secs),
            ("queue.backoff_base_secs", self.backoff_base_secs),
            ("queue.backoff_max_secs", self.backoff_max_secs),
        ] {
            if secs > MAX_PERIOD_SECS {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be <= {MAX_PERIOD_SECS}"),
                ));
            }
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(ConfigError::invalid(
                "queue.backoff_max_secs",
                "must be >= queue.backoff_base_secs",
            ));
        }
        Ok(())
    }
}
