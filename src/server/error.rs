use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::feed::{FetchError, GenerationError, ParseError};
use crate::filter::FilterParamError;
use crate::util::UrlValidationError;

/// Every failure a request can end in, mapped to an HTTP status by
/// [`IntoResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed query parameter
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidParam(#[from] FilterParamError),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse feed: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to generate feed: {0}")]
    Generation(#[from] GenerationError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidParam(_) | ApiError::InvalidUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Fetch(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
            // Both parse failures are the upstream's fault; `kind` tells them apart
            ApiError::Parse(_) => StatusCode::BAD_GATEWAY,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error classification.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::InvalidParam(_) => "validation",
            ApiError::InvalidUrl(_) => "invalid_url",
            ApiError::Fetch(FetchError::Timeout(_)) => "upstream_timeout",
            ApiError::Fetch(FetchError::HttpStatus(_)) => "upstream_status",
            ApiError::Fetch(_) => "upstream_fetch",
            ApiError::Parse(ParseError::UnrecognizedFormat(_)) => "unrecognized_format",
            ApiError::Parse(ParseError::MalformedDocument(_)) => "malformed_document",
            ApiError::Generation(GenerationError::UnsupportedTarget(_)) => "unsupported_target",
            ApiError::Generation(_) => "generation",
        }
    }

    fn summary(&self) -> (String, Option<String>) {
        match self {
            ApiError::Validation(msg) => (msg.clone(), None),
            ApiError::InvalidParam(e) => (e.to_string(), None),
            ApiError::InvalidUrl(e) => ("Invalid feed URL".to_string(), Some(e.to_string())),
            ApiError::Fetch(e) => ("Failed to fetch feed".to_string(), Some(e.to_string())),
            ApiError::Parse(e) => ("Failed to parse feed".to_string(), Some(e.to_string())),
            ApiError::Generation(e) => ("Failed to generate feed".to_string(), Some(e.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), kind, error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), kind, error = %self, "Request rejected");
        }

        let (error, details) = self.summary();
        (status, Json(ErrorResponse { error, kind, details })).into_response()
    }
}
