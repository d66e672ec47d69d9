//! Store-write notification rules.

use quarry_core::{DatasetLayout, SourceDataset};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A key filter: writes whose key starts with `prefix` (and ends with
/// `suffix`, when set) produce a change event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationRule {
    pub prefix: String,
    #[serde(default)]
    pub suffix: Option<String>,
}

impl NotificationRule {
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
            && self
                .suffix
                .as_deref()
                .is_none_or(|suffix| key.ends_with(suffix))
    }

    /// The rule used when none are configured: JSON objects under the API
    /// snapshot prefix.
    #[must_use]
    pub fn api_snapshots(layout: &DatasetLayout) -> Self {
        Self {
            prefix: format!("{}/", layout.prefix(SourceDataset::ApiSnapshot)),
            suffix: Some(String::from(".json")),
        }
    }

    fn is_within(&self, prefix: &str) -> bool {
        self.prefix == prefix
            || self
                .prefix
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Notification rules. An empty list means [`NotificationRule::api_snapshots`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub rules: Vec<NotificationRule>,
}

impl NotificationsConfig {
    /// Rules in effect for `layout`.
    #[must_use]
    pub fn effective_rules(&self, layout: &DatasetLayout) -> Vec<NotificationRule> {
        if self.rules.is_empty() {
            vec![NotificationRule::api_snapshots(layout)]
        } else {
            self.rules.clone()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.iter().any(|rule| rule.prefix.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "notifications.rules.prefix",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Every rule must sit inside a dataset prefix, and the API latest
    /// pointer must be covered by at least one rule.
    pub(crate) fn validate_against(&self, layout: &DatasetLayout) -> Result<(), ConfigError> {
        if let Some(rule) = self.rules.iter().find(|rule| {
            !SourceDataset::ALL
                .into_iter()
                .any(|dataset| rule.is_within(layout.prefix(dataset)))
        }) {
            return Err(ConfigError::invalid(
                "notifications.rules.prefix",
                format!("'{}' is outside every dataset prefix", rule.prefix),
            ));
        }

        let latest = layout.latest_key(SourceDataset::ApiSnapshot);
        if !self
            .effective_rules(layout)
            .iter()
            .any(|rule| rule.matches(&latest))
        {
            return Err(ConfigError::invalid(
                "notifications.rules",
                format!("no rule matches API snapshot writes such as '{latest}'"),
            ));
        }
        Ok(())
    }
}
