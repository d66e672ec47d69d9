//! Analytics task configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_workers() -> usize {
    1
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_receive_wait_secs() -> u64 {
    20
}

fn default_sink_path() -> String {
    String::from(".quarry/results.jsonl")
}

const fn default_start_year() -> i32 {
    2013
}

const fn default_end_year() -> i32 {
    2018
}

fn default_report_series() -> String {
    String::from("PRS30006032")
}

fn default_report_period() -> String {
    String::from("Q01")
}

/// Where analytics results are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Structured `tracing` event.
    #[default]
    Log,
    /// One JSON line per result appended to `sink_path`.
    Jsonl,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Concurrent queue consumers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-message budget; exceeding it fails the message.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long an idle worker waits for a message before polling again.
    #[serde(default = "default_receive_wait_secs")]
    pub receive_wait_secs: u64,

    #[serde(default)]
    pub sink: SinkKind,

    #[serde(default = "default_sink_path")]
    pub sink_path: String,

    /// Inclusive year range for population statistics.
    #[serde(default = "default_start_year")]
    pub population_start_year: i32,

    #[serde(default = "default_end_year")]
    pub population_end_year: i32,

    /// Series and period joined with population in the combined report.
    #[serde(default = "default_report_series")]
    pub report_series: String,

    #[serde(default = "default_report_period")]
    pub report_period: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            receive_wait_secs: default_receive_wait_secs(),
            sink: SinkKind::default(),
            sink_path: default_sink_path(),
            population_start_year: default_start_year(),
            population_end_year: default_end_year(),
            report_series: default_report_series(),
            report_period: default_report_period(),
        }
    }
}

impl AnalyticsConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn receive_wait(&self) -> Duration {
        Duration::from_secs(self.receive_wait_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("analytics.workers", "must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("analytics.timeout_secs", "must be > 0"));
        }
        if self.population_end_year < self.population_start_year {
            return Err(ConfigError::invalid(
                "analytics.population_end_year",
                "must be >= analytics.population_start_year",
            ));
        }
        if self.sink == SinkKind::Jsonl && self.sink_path.trim().is_empty() {
            return Err(ConfigError::invalid(
                "analytics.sink_path",
                "required for the jsonl sink",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.workers, 1);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.sink, SinkKind::Log);
        assert_eq!(
            (config.population_start_year, config.population_end_year),
            (2013, 2018)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let config = AnalyticsConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
