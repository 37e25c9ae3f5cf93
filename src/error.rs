use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::security::SecureFailure;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed input. Safe to be specific.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed, or expired session credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Resource absent. Safe; reveals nothing about other users.
    #[error("{0}")]
    NotFound(String),

    /// Authorization failure whose reason does not need hiding (e.g. an
    /// invitation addressed to a different email).
    #[error("{0}")]
    Forbidden(String),

    /// Idempotency conflict (invitation already accepted/declined).
    #[error("{0}")]
    Conflict(String),

    /// Volumetric limit hit. Observable by design; carries limiter
    /// metadata for response headers.
    #[error("rate limit exceeded")]
    RateLimited { remaining: i64, reset_at: i64 },

    /// The uniform, enumeration-proof failure family. Always the same
    /// status and body for a given kind, regardless of root cause.
    #[error("{}", .0.message())]
    Secure(SecureFailure),

    /// Unexpected failure. Full detail is logged server-side; the caller
    /// only ever sees a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Internal(format!("database error: {err}"))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Internal(format!("connection pool error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization error: {err}"))
    }
}

fn error_body(message: &str) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "error": message }))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, error_body(&message)).into_response()
            }
            AppError::Unauthenticated(message) => {
                (StatusCode::UNAUTHORIZED, error_body(&message)).into_response()
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, error_body(&message)).into_response()
            }
            AppError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, error_body(&message)).into_response()
            }
            AppError::Conflict(message) => {
                (StatusCode::CONFLICT, error_body(&message)).into_response()
            }
            AppError::RateLimited { remaining, reset_at } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    error_body("Too many requests, try again later"),
                )
                    .into_response();
                response.headers_mut().insert(
                    HeaderName::from_static("x-ratelimit-remaining"),
                    HeaderValue::from(remaining.max(0)),
                );
                response.headers_mut().insert(
                    HeaderName::from_static("x-ratelimit-reset"),
                    HeaderValue::from(reset_at),
                );
                response
            }
            AppError::Secure(kind) => (kind.status(), error_body(kind.message())).into_response(),
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
                    .into_response()
            }
        }
    }
}
