//! Shared HTTP plumbing for the git adapters
//!
//! Status-code to error mapping and pagination header parsing. Both
//! providers report errors as JSON with a `message` field.

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::GitProviderError;

/// Page size requested from both providers (their maximum)
pub const PER_PAGE: u32 = 100;

#[derive(Deserialize)]
struct ErrorBody {
    message: serde_json::Value,
}

/// Deserialize a successful response, or map the failure
pub async fn handle_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, GitProviderError> {
    if response.status().is_success() {
        response
            .json()
            .await
            .map_err(|e| GitProviderError::Deserialization(e.to_string()))
    } else {
        Err(error_from_response(response).await)
    }
}

/// Accept any 2xx response and discard the body
pub async fn handle_empty_response(response: Response) -> Result<(), GitProviderError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

/// Turn a non-success response into the matching error variant
pub fn error_for_status_code(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> GitProviderError {
    let message = error_message(body);

    match status.as_u16() {
        401 => GitProviderError::Unauthorized { message },
        429 => GitProviderError::RateLimited {
            retry_after_secs: retry_after(headers),
        },
        403 if rate_limit_exhausted(headers) => GitProviderError::RateLimited {
            retry_after_secs: retry_after(headers),
        },
        status => GitProviderError::Api { status, message },
    }
}

async fn error_from_response(response: Response) -> GitProviderError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    error_for_status_code(status, &headers, &body)
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: serde_json::Value::String(s),
        }) => s,
        // GitLab validation errors nest messages in an object
        Ok(ErrorBody { message }) => message.to_string(),
        Err(_) => body.to_string(),
    }
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    header_str(headers, "x-ratelimit-remaining") == Some("0")
}

/// Seconds to wait, from `Retry-After` or GitHub's `x-ratelimit-reset`
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.parse().ok()) {
        return Some(secs);
    }
    let reset: i64 = header_str(headers, "x-ratelimit-reset")?.parse().ok()?;
    let now = chrono::Utc::now().timestamp();
    Some(reset.saturating_sub(now).max(0) as u64)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// URL of the next page from a GitHub `Link` header
///
/// URLs may themselves contain commas (`affiliation=owner,collaborator`), so
/// entries are delimited by their angle brackets rather than by splitting.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let mut rest = header_str(headers, "link")?;

    while let Some(start) = rest.find('<') {
        let end = start + rest[start..].find('>')?;
        let url = &rest[start + 1..end];
        let params_end = rest[end..]
            .find('<')
            .map(|i| end + i)
            .unwrap_or(rest.len());

        let is_next = rest[end + 1..params_end]
            .split(';')
            .any(|p| p.trim().trim_end_matches(',').trim_end() == r#"rel="next""#);
        if is_next {
            return Some(url.to_string());
        }
        rest = &rest[params_end..];
    }

    None
}

/// Number of the next page from GitLab's `x-next-page` header
pub fn next_page(headers: &HeaderMap) -> Option<u32> {
    header_str(headers, "x-next-page")
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}
