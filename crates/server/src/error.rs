//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use wisp_core::ExpiryCause;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Expiry cause, present only on `gone` responses where one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<&'static str>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("wish not found: {0}")]
    NotFound(String),

    /// The wish is gone: expired on this read, viewed to exhaustion earlier,
    /// or explicitly deleted. `cause` is only set when this request is the
    /// one that discovered the expiry.
    #[error("wish has expired or already been viewed")]
    Gone { cause: Option<ExpiryCause> },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("a sweep is already running")]
    SweepRunning,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] wisp_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] wisp_metadata::MetadataError),

    #[error("invalid request: {0}")]
    Core(#[from] wisp_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Gone { .. } => "gone",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited(_) => "rate_limited",
            Self::SweepRunning => "sweep_running",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                wisp_storage::StorageError::NotFound(_) => "not_found",
                _ => "storage_error",
            },
            Self::Metadata(e) => match e {
                wisp_metadata::MetadataError::NotFound(_) => "not_found",
                _ => "metadata_error",
            },
            // A malformed slug cannot name a wish; report it like a miss so
            // probing requests learn nothing about slug shape.
            Self::Core(wisp_core::Error::InvalidSlug(_)) => "not_found",
            Self::Core(_) => "bad_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gone { .. } => StatusCode::GONE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::SweepRunning => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                wisp_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                wisp_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                wisp_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(wisp_core::Error::InvalidSlug(_)) => StatusCode::NOT_FOUND,
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let cause = match &self {
            Self::Gone { cause } => cause.map(|c| c.as_str()),
            _ => None,
        };
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            cause,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
