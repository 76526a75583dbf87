//! Shared request execution and response classification

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::error::FetchError;

/// Sends `request` once and parses a JSON body.
///
/// There is no retry here: a failure is reported to the caller, which moves
/// on to its next strategy.
///
/// # Errors
/// * Transport failures map to `NetworkTimeout`, `NetworkConnection` or `Transport`
/// * Non-2xx statuses map through [`FetchError::from_status`]
/// * Bodies are classified as `NoData` (empty), `MalformedJson` (not JSON) or
///   `UnexpectedStructure` (JSON of the wrong shape)
#[instrument(skip(request))]
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
    origin: &str,
) -> Result<T, FetchError> {
    let response = send_checked(request, url).await?;
    let response_text = response
        .text()
        .await
        .map_err(|e| FetchError::from_transport(url, &e))?;

    debug!("Response length: {} bytes", response_text.len());
    parse_json_body(&response_text, origin)
}

/// Sends `request` once and fails on a non-success status.
pub async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response, FetchError> {
    let response = request.send().await.map_err(|e| {
        error!("Request failed for URL {}: {}", url, e);
        FetchError::from_transport(url, &e)
    })?;

    let status = response.status();
    debug!("Response status: {status}");
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Unknown error");
        error!("HTTP {} - {} (URL: {})", status.as_u16(), reason, url);
        return Err(FetchError::from_status(status.as_u16(), url));
    }
    Ok(response)
}

/// Classifies a body that should hold `T`
pub fn parse_json_body<T: DeserializeOwned>(body: &str, origin: &str) -> Result<T, FetchError> {
    match serde_json::from_str::<T>(body) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            let trimmed = body.trim_start();
            if trimmed.is_empty() {
                Err(FetchError::no_data(origin, "Response body is empty"))
            } else if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                Err(FetchError::malformed_json(origin, "Response is not valid JSON"))
            } else if e.is_syntax() || e.is_eof() {
                Err(FetchError::malformed_json(origin, e.to_string()))
            } else {
                Err(FetchError::unexpected_structure(origin, e.to_string()))
            }
        }
    }
}
