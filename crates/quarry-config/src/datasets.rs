//! Source dataset configuration (website mirror and API snapshot).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_website_prefix() -> String {
    String::from("bls-data")
}

fn default_index_url() -> String {
    String::from("https://download.bls.gov/pub/time.series/pr/")
}

fn default_primary_file() -> String {
    String::from("pr.data.0.Current")
}

fn default_user_agent() -> String {
    String::from("quarry/0.1 (+ops@example.com)")
}

fn default_api_prefix() -> String {
    String::from("api-data")
}

fn default_api_url() -> String {
    String::from("https://honolulu-api.datausa.io/tesseract/data.jsonrecords")
}

fn default_api_params() -> BTreeMap<String, String> {
    [
        ("cube", "acs_yg_total_population_1"),
        ("drilldowns", "Year,Nation"),
        ("locale", "en"),
        ("measures", "Population"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebsiteConfig {
    /// Storage prefix for mirrored files.
    #[serde(default = "default_website_prefix")]
    pub prefix: String,

    /// Directory index page listing the files to mirror.
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// File analytics reads as this dataset's current state.
    #[serde(default = "default_primary_file")]
    pub primary_file: String,

    /// `User-Agent` sent with every request. The upstream rejects anonymous agents.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            prefix: default_website_prefix(),
            index_url: default_index_url(),
            primary_file: default_primary_file(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Storage prefix for snapshots and the latest pointer.
    #[serde(default = "default_api_prefix")]
    pub prefix: String,

    #[serde(default = "default_api_url")]
    pub url: String,

    /// Query parameters appended to `url`.
    #[serde(default = "default_api_params")]
    pub params: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_api_prefix(),
            url: default_api_url(),
            params: default_api_params(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatasetsConfig {
    #[serde(default)]
    pub website: WebsiteConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl DatasetsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.website.index_url) {
            return Err(ConfigError::invalid(
                "datasets.website.index_url",
                "must be an http(s) URL",
            ));
        }
        if self.website.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid(
                "datasets.website.user_agent",
                "must not be empty",
            ));
        }
        if !is_http_url(&self.api.url) {
            return Err(ConfigError::invalid(
                "datasets.api.url",
                "must be an http(s) URL",
            ));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_original_sources() {
        let config = DatasetsConfig::default();
        assert_eq!(config.website.prefix, "bls-data");
        assert_eq!(config.website.primary_file, "pr.data.0.Current");
        assert_eq!(config.api.prefix, "api-data");
        assert_eq!(
            config.api.params.get("measures").map(String::as_str),
            Some("Population")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_http_urls() {
        let mut config = DatasetsConfig::default();
        config.api.url = "ftp://example.com/data".into();
        assert!(config.validate().is_err());
    }
}
