use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cfa_db::error::DispatchError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error": message, "code": CODE}`
/// bodies. Nothing here aborts the process; every failure becomes a
/// response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure from the job store, registry or result store.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The queue holds nothing this caller can take.
    #[error("{0}")]
    NoJobAvailable(String),

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
            AppError::Dispatch(DispatchError::QueueUnavailable(dir)) => {
                tracing::warn!(queue_dir = %dir.display(), "Queue directory missing");
                (
                    StatusCode::NOT_FOUND,
                    "QUEUE_UNAVAILABLE",
                    "Queue folder does not exist".to_string(),
                )
            }
            AppError::Dispatch(err) => {
                tracing::error!(error = %err, "Dispatch error");
                internal()
            }
            AppError::NoJobAvailable(msg) => {
                (StatusCode::NOT_FOUND, "NO_JOB_AVAILABLE", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
