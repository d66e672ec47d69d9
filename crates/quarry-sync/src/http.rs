//! Shared HTTP helpers for the remote sources.
//!
//! Centralizes client construction and status-code checks (429 rate limiting
//! with `Retry-After` parsing, non-success -> [`SyncError::Api`]) so the
//! sources stay focused on request construction and response mapping.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::SyncError;

/// Build a client that identifies itself with `user_agent`.
///
/// `referer`, when given, is sent with every request.
pub(crate) fn build_client(
    user_agent: &str,
    referer: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, SyncError> {
    let mut headers = HeaderMap::new();
    if let Some(referer) = referer {
        let value = HeaderValue::from_str(referer).map_err(|e| SyncError::InvalidUrl {
            url: referer.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(header::REFERER, value);
    }
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** -> [`SyncError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** -> [`SyncError::Api`] with status code and
///   response body.
///
/// Callers that send conditional requests check for `304` first.
pub(crate) async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, SyncError> {
    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SyncError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !resp.status().is_success() {
        return Err(SyncError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Whether a conditional request was answered with `304 Not Modified`.
pub(crate) fn is_not_modified(resp: &reqwest::Response) -> bool {
    resp.status() == reqwest::StatusCode::NOT_MODIFIED
}

/// A response header as an owned string, if present and valid UTF-8.
pub(crate) fn header_string(resp: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(60)
}
