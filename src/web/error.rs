//! Error responses for the stats service.
//!
//! Failures are answered as `{"error": {"code": ..., "message": ...}}`.
//! Only request problems are described to the client; store and internal
//! failures are logged here and answered with a fixed message.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::TagwatchError;

/// Message sent in place of any internal failure.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Handler result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Machine-readable error code in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    InternalError,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: ErrorCode,
    message: &'a str,
}

/// A failed stats request.
#[derive(Debug)]
pub enum ApiError {
    /// The query string was missing or malformed.
    BadRequest(String),
    /// No route for the requested path.
    NotFound(String),
    /// Anything else. The cause has already been logged.
    Internal,
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::BadRequest(_) => ErrorCode::BadRequest,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Internal => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::NotFound(path) => path,
            ApiError::Internal => INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<TagwatchError> for ApiError {
    fn from(err: TagwatchError) -> Self {
        match err {
            TagwatchError::Validation(msg) => ApiError::BadRequest(msg),
            other => {
                tracing::error!("Stats request failed: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
