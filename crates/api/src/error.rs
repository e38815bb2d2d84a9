use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vitals_core::error::CoreError;
use vitals_db::StoreError;

use crate::response::ErrorResponse;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vitals_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence-layer error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, error_class = "internal", "Internal core error");
                    internal()
                }
            },

            // --- Persistence errors ---
            AppError::Store(err) => {
                tracing::error!(error = %err, error_class = store_error_class(err), "Store error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, error_class = "internal", "Internal error");
                internal()
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Stable class label for log aggregation.
fn store_error_class(err: &StoreError) -> &'static str {
    match err {
        StoreError::Database(_) => "persistence",
        StoreError::Corrupt(_) => "persistence.corrupt",
        StoreError::Unavailable(_) => "persistence.unavailable",
    }
}
