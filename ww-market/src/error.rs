//! Error types for ww-market
//!
//! Every handler error renders as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use ww_common::image::ImageError;
use ww_common::status::TransitionError;

use crate::classify::ClassifyError;
use crate::services::{AccountError, MarketError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - entity not in the state the action starts from
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Remote collaborator failed (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Feature disabled by configuration (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// ww-common error
    #[error("Common error: {0}")]
    Common(#[from] ww_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => match err {
                ww_common::Error::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                ww_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                ),
            },
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::Unauthenticated => ApiError::Unauthorized(message),
            TransitionError::MissingReference(_) => ApiError::NotFound(message),
            TransitionError::InvalidState { .. } | TransitionError::NotAssigned(_) => {
                ApiError::Conflict(message)
            }
            TransitionError::Validation(_) => ApiError::BadRequest(message),
            TransitionError::Encoding(_) => ApiError::Internal(message),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Transition(e) => e.into(),
            MarketError::Image(e) => e.into(),
            MarketError::Store(e) => e.into(),
            MarketError::Write(e) => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::InvalidEmail | AccountError::WeakPassword(_) => {
                ApiError::BadRequest(message)
            }
            AccountError::EmailTaken(_) => ApiError::Conflict(message),
            AccountError::InvalidCredentials => ApiError::Unauthorized(message),
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::Config(msg) => ApiError::Unavailable(msg),
            other => ApiError::BadGateway(format!(
                "{}. Please try again with another photo.",
                other
            )),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
