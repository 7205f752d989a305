use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::errors::{ApiError, ErrorEnvelope};
use crate::infrastructure::logging::SecretScrubber;

/// Decode a response into `T`, or into the most specific [`ApiError`] available.
pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network_error(&e))?;

    debug!(status = %status, bytes = body.len(), "response received");

    if !status.is_success() {
        return Err(handle_error_body(status, &body));
    }

    if body.trim().is_empty() {
        return Err(ApiError::empty_response(status));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::decode_error(status, &e))
}

fn handle_error_body(status: reqwest::StatusCode, body: &str) -> ApiError {
    warn!(
        status = %status,
        body = %SecretScrubber::new().scrub_message(body),
        "API error response"
    );
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_else(|_| ApiError::http_error(status))
}
