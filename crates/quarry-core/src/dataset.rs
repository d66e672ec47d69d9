//! Source datasets and their storage layout.
//!
//! Every dataset owns exactly one storage prefix. Prefixes come from
//! configuration and are validated once, when the [`DatasetLayout`] is built;
//! nothing downstream hardcodes a prefix string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, keys};

/// A data source mirrored into the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDataset {
    /// Files mirrored from a remote website directory.
    WebsiteFileSet,
    /// JSON snapshots fetched from a remote API.
    ApiSnapshot,
}

impl SourceDataset {
    /// All datasets, in a stable order.
    pub const ALL: [Self; 2] = [Self::WebsiteFileSet, Self::ApiSnapshot];

    /// Logical name used in logs, CLI flags, and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WebsiteFileSet => "website",
            Self::ApiSnapshot => "api",
        }
    }
}

impl fmt::Display for SourceDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceDataset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "website" => Ok(Self::WebsiteFileSet),
            "api" => Ok(Self::ApiSnapshot),
            other => Err(CoreError::Validation(format!(
                "unknown dataset '{other}' (expected 'website' or 'api')"
            ))),
        }
    }
}

/// Validated mapping from datasets to storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    website_prefix: String,
    api_prefix: String,
    website_primary_file: String,
}

impl DatasetLayout {
    /// Build a layout, validating every prefix and the primary file name.
    ///
    /// The two prefixes must be distinct and neither may contain the other,
    /// so a key always belongs to at most one dataset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPrefix`] or [`CoreError::InvalidKey`] on bad
    /// input, and [`CoreError::Validation`] when the prefixes overlap.
    pub fn new(
        website_prefix: impl Into<String>,
        api_prefix: impl Into<String>,
        website_primary_file: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let website_prefix = website_prefix.into();
        let api_prefix = api_prefix.into();
        let website_primary_file = website_primary_file.into();

        keys::validate_prefix(&website_prefix)?;
        keys::validate_prefix(&api_prefix)?;
        keys::validate_name(&website_primary_file)?;

        if website_prefix == api_prefix
            || keys::is_under(&website_prefix, &api_prefix)
            || keys::is_under(&api_prefix, &website_prefix)
        {
            return Err(CoreError::Validation(format!(
                "dataset prefixes overlap: '{website_prefix}' and '{api_prefix}'"
            )));
        }
        if website_primary_file == keys::SYNC_METADATA_NAME {
            return Err(CoreError::Validation(format!(
                "primary file name '{website_primary_file}' is reserved"
            )));
        }

        Ok(Self {
            website_prefix,
            api_prefix,
            website_primary_file,
        })
    }

    /// Storage prefix owned by `dataset`.
    #[must_use]
    pub fn prefix(&self, dataset: SourceDataset) -> &str {
        match dataset {
            SourceDataset::WebsiteFileSet => &self.website_prefix,
            SourceDataset::ApiSnapshot => &self.api_prefix,
        }
    }

    /// Key of the object analytics treats as the dataset's current state.
    ///
    /// For the API dataset this is the latest pointer; for the website dataset
    /// it is the mirrored primary file.
    #[must_use]
    pub fn latest_key(&self, dataset: SourceDataset) -> String {
        match dataset {
            SourceDataset::WebsiteFileSet => {
                keys::join(&self.website_prefix, &self.website_primary_file)
            }
            SourceDataset::ApiSnapshot => keys::latest_key(&self.api_prefix),
        }
    }

    /// Key of the website sync metadata document.
    #[must_use]
    pub fn sync_metadata_key(&self) -> String {
        keys::sync_metadata_key(&self.website_prefix)
    }

    /// Dataset owning `key`, if any.
    #[must_use]
    pub fn dataset_for_key(&self, key: &str) -> Option<SourceDataset> {
        SourceDataset::ALL
            .into_iter()
            .find(|dataset| keys::is_under(key, self.prefix(*dataset)))
    }
}
