use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub const HTTP_ERROR: &str = "http_error";
pub const EMPTY_RESPONSE: &str = "empty_response";
pub const NETWORK_ERROR: &str = "network_error";
pub const DECODE_ERROR: &str = "decode_error";
pub const ENCODE_ERROR: &str = "encode_error";
pub const INVALID_REQUEST: &str = "invalid_request";

/// Structured error from the API or from the client's own handling of a call.
///
/// `code` is the HTTP status, the server's own error code, or `0` when no
/// response arrived.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("API error {code}: {message}")]
pub struct ApiError {
    pub code: i32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Wire form of an error body: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    fn synthetic(code: i32, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            error_type: Some(error_type.to_string()),
            message: message.into(),
            metadata: None,
        }
    }

    /// Fallback when a non-2xx body is not an error envelope.
    pub fn http_error(status: StatusCode) -> Self {
        Self::synthetic(
            i32::from(status.as_u16()),
            HTTP_ERROR,
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        )
    }

    pub fn empty_response(status: StatusCode) -> Self {
        Self::synthetic(i32::from(status.as_u16()), EMPTY_RESPONSE, "Empty response body")
    }

    pub fn network_error(err: &reqwest::Error) -> Self {
        Self::synthetic(0, NETWORK_ERROR, err.to_string())
    }

    pub fn decode_error(status: StatusCode, err: &serde_json::Error) -> Self {
        Self::synthetic(
            i32::from(status.as_u16()),
            DECODE_ERROR,
            format!("Failed to decode response body: {err}"),
        )
    }

    pub fn encode_error(message: impl Into<String>) -> Self {
        Self::synthetic(0, ENCODE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::synthetic(400, INVALID_REQUEST, message)
    }

    pub fn is_type(&self, error_type: &str) -> bool {
        self.error_type.as_deref() == Some(error_type)
    }

    /// True when no response was received.
    pub fn is_network(&self) -> bool {
        self.is_type(NETWORK_ERROR)
    }
}

impl From<crate::domain::errors::CodecError> for ApiError {
    fn from(err: crate::domain::errors::CodecError) -> Self {
        Self::encode_error(err.to_string())
    }
}
