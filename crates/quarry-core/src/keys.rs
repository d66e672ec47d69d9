//! Object key helpers.
//!
//! Keys are `/`-separated paths rooted at a dataset prefix, e.g.
//! `api-data/2024-01-01T00:00:00Z.json`. Prefixes are stored without a
//! leading or trailing `/`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::CoreError;

/// File name of the latest pointer under an API-backed prefix.
pub const LATEST_NAME: &str = "latest.json";

/// File name of the website sync metadata document.
pub const SYNC_METADATA_NAME: &str = "_sync_metadata.json";

/// Validate a storage prefix.
///
/// A prefix is one or more non-empty `/`-separated segments with no leading
/// or trailing `/`, no `.`/`..` segments, and no control characters.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPrefix`] describing the first violation.
pub fn validate_prefix(prefix: &str) -> Result<(), CoreError> {
    let invalid = |reason: &str| CoreError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: reason.to_string(),
    };

    if prefix.trim().is_empty() {
        return Err(invalid("prefix is empty"));
    }
    if prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(invalid("prefix must not start or end with '/'"));
    }
    for segment in prefix.split('/') {
        validate_segment(segment).map_err(|reason| invalid(reason))?;
    }
    Ok(())
}

/// Validate a single key segment (a file name).
///
/// # Errors
///
/// Returns [`CoreError::InvalidKey`] if the name is empty, contains `/`,
/// is `.`/`..`, or contains control characters.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.contains('/') {
        return Err(CoreError::InvalidKey {
            key: name.to_string(),
            reason: "name must not contain '/'".to_string(),
        });
    }
    validate_segment(name).map_err(|reason| CoreError::InvalidKey {
        key: name.to_string(),
        reason: reason.to_string(),
    })
}

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment == "." || segment == ".." {
        return Err("relative path segment");
    }
    if segment.chars().any(char::is_control) {
        return Err("control character in path");
    }
    Ok(())
}

/// Join a prefix and a file name into an object key.
#[must_use]
pub fn join(prefix: &str, name: &str) -> String {
    format!("{prefix}/{name}")
}

/// Key of a timestamped API snapshot: `<prefix>/<RFC3339 seconds>.json`.
#[must_use]
pub fn snapshot_key(prefix: &str, fetched_at: DateTime<Utc>) -> String {
    let stamp = fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    join(prefix, &format!("{stamp}.json"))
}

/// Key of the latest pointer for an API-backed prefix.
#[must_use]
pub fn latest_key(prefix: &str) -> String {
    join(prefix, LATEST_NAME)
}

/// Key of the website sync metadata document.
#[must_use]
pub fn sync_metadata_key(prefix: &str) -> String {
    join(prefix, SYNC_METADATA_NAME)
}

/// Whether `key` lives under `prefix` (segment-aware: `api` does not own `api-data/x`).
#[must_use]
pub fn is_under(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
}
