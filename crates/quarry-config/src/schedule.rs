//! Daily sync schedule and fetcher budgets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_true() -> bool {
    true
}

const fn default_hour() -> u32 {
    2
}

const fn default_sync_timeout_secs() -> u64 {
    600
}

const fn default_http_timeout_secs() -> u64 {
    30
}

/// When the scheduler fires the sync task (UTC wall clock, once per day).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: default_hour(),
            minute: 0,
        }
    }
}

impl ScheduleConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.hour >= 24 {
            return Err(ConfigError::invalid("schedule.hour", "must be in 0..24"));
        }
        if self.minute >= 60 {
            return Err(ConfigError::invalid("schedule.minute", "must be in 0..60"));
        }
        Ok(())
    }
}

/// Time budgets for one fetcher invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Whole-invocation budget; exceeding it counts as a failed run.
    #[serde(default = "default_sync_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sync_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("sync.timeout_secs", "must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::invalid("sync.http_timeout_secs", "must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_fire_at_two_am() {
        let config = ScheduleConfig::default();
        assert!(config.enabled);
        assert_eq!((config.hour, config.minute), (2, 0));
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(24, 0)]
    #[case(0, 60)]
    fn rejects_out_of_range_times(#[case] hour: u32, #[case] minute: u32) {
        let config = ScheduleConfig {
            enabled: true,
            hour,
            minute,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sync_budget_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }
}
