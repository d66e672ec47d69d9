//! HTTP directory-index source.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quarry_config::WebsiteConfig;
use reqwest::{Url, header};
use scraper::{ElementRef, Html, Selector};

use crate::http::{build_client, check_response, header_string, is_not_modified};
use crate::source::{FetchOutcome, FetchedFile, FileSource, RemoteFile, Validators};
use crate::SyncError;

/// Mirrors the files linked from an HTML directory index.
pub struct HttpIndexSource {
    http: reqwest::Client,
    index_url: Url,
}

impl HttpIndexSource {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] for a malformed index URL, or
    /// [`SyncError::Http`] if the client cannot be built.
    pub fn new(config: &WebsiteConfig, timeout: Duration) -> Result<Self, SyncError> {
        let index_url = Url::parse(&config.index_url).map_err(|e| SyncError::InvalidUrl {
            url: config.index_url.clone(),
            reason: e.to_string(),
        })?;
        let http = build_client(&config.user_agent, Some(index_url.as_str()), timeout)?;
        Ok(Self { http, index_url })
    }
}

#[async_trait]
impl FileSource for HttpIndexSource {
    async fn list(&self) -> Result<Vec<RemoteFile>, SyncError> {
        let resp = check_response(self.http.get(self.index_url.clone()).send().await?).await?;
        let html = resp.text().await?;
        let files = parse_index(&html, &self.index_url)?;
        tracing::debug!(url = %self.index_url, files = files.len(), "index listed");
        Ok(files)
    }

    async fn fetch(
        &self,
        file: &RemoteFile,
        validators: &Validators,
    ) -> Result<FetchOutcome, SyncError> {
        let mut request = self.http.get(&file.url);
        if let Some(etag) = &validators.etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(header::IF_MODIFIED_SINCE, last_modified);
        }

        let resp = request.send().await?;
        if is_not_modified(&resp) {
            return Ok(FetchOutcome::NotModified);
        }
        let resp = check_response(resp).await?;
        let validators = Validators {
            etag: header_string(&resp, header::ETAG),
            last_modified: header_string(&resp, header::LAST_MODIFIED),
        };
        let bytes = resp.bytes().await?.to_vec();
        Ok(FetchOutcome::Content(FetchedFile { bytes, validators }))
    }
}

/// Extract file links from a directory index page.
///
/// Skips sorting links (`?C=M;O=A`), fragments, and directories (trailing
/// `/`, which also covers the parent link). Links are resolved against `base`
/// and named by their final path segment; the first link wins on duplicates.
///
/// # Errors
///
/// Returns [`SyncError::Parse`] if the anchor selector cannot be built.
pub fn parse_index(html: &str, base: &Url) -> Result<Vec<RemoteFile>, SyncError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").map_err(|e| SyncError::Parse(e.to_string()))?;

    let mut files = BTreeMap::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('?')
            || href.starts_with('#')
            || href.ends_with('/')
        {
            continue;
        }
        let Ok(url) = base.join(href) else {
            tracing::debug!(href, "skipping unresolvable link");
            continue;
        };
        if url.host_str() != base.host_str() {
            continue;
        }
        let Some(name) = url
            .path_segments()
            .and_then(Iterator::last)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };

        files.entry(name.clone()).or_insert_with(|| RemoteFile {
            name,
            url: url.to_string(),
            fingerprint: listing_fingerprint(anchor),
        });
    }
    Ok(files.into_values().collect())
}

/// Whitespace-normalized text preceding the anchor on its listing line
/// (IIS-style indexes put the date, time, and size there).
fn listing_fingerprint(anchor: ElementRef<'_>) -> Option<String> {
    let text = anchor.prev_sibling()?.value().as_text()?;
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}
