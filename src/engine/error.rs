//! Per-request failure taxonomy and its HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors a request can end with. None of them outlive the request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request body exceeded the read ceiling.
    #[error("request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: u64 },

    /// The duration ceiling expired (or the client went away) before completion.
    #[error("request did not complete within the maximum duration")]
    DeadlineExceeded,

    /// `/redirect-to` target host is not on the allow-list.
    #[error("forbidden redirect target {host:?}")]
    ForbiddenRedirectTarget { host: String, allowed: Vec<String> },

    /// Requested byte range lies outside the resource.
    #[error("range not satisfiable for a {len} byte resource")]
    RangeNotSatisfiable { len: u64 },

    /// Malformed or out-of-range path/query parameter.
    #[error("{0}")]
    InvalidParameter(String),

    /// Anything else. The message is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EngineError::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::ForbiddenRedirectTarget { .. } => StatusCode::BAD_REQUEST,
            EngineError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            EngineError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            EngineError::Internal(_) => None,
            EngineError::ForbiddenRedirectTarget { allowed, .. } => Some(format!(
                "Forbidden redirect URL. Please be careful with this link. Allowed redirect destinations: {}",
                allowed.join(", ")
            )),
            other => Some(other.to_string()),
        }
    }
}

/// JSON error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        if let EngineError::Internal(message) = &self {
            tracing::error!(error = %message, "Internal failure while handling request");
        }

        let status = self.status();
        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            detail: self.detail(),
        };

        let mut response = (status, Json(body)).into_response();
        if let EngineError::RangeNotSatisfiable { len } = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{len}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}
