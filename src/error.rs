//! Error taxonomy for the task execution and replay core.
//!
//! Mirrors the teacher crate's `A2AError` pattern — one `thiserror` enum with
//! a message per variant and message-only convenience constructors — but
//! maps to HTTP status codes at the transport edge instead of JSON-RPC error
//! codes, since this surface is plain REST rather than JSON-RPC.
//!
//! Propagation policy: backing-store outages are recovered internally and
//! never surface here; workflow failures are materialized as terminal
//! `error` events on the stream, not returned from handlers. This enum
//! exists for API-shape failures: bad input, unknown task, conflicting
//! feedback, operations that don't apply to a task's current state.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Unified error type for task-manager and HTTP-surface operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// Unknown task id (HTTP 404).
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Interrupt feedback submitted for a task that isn't awaiting one, or a
    /// second submission racing the first (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed request body or query parameters (HTTP 400).
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Operation rejected because the task has already reached a terminal
    /// state (HTTP 409).
    #[error("task already terminal: {0}")]
    AlreadyTerminal(String),

    /// Catch-all for unexpected internal failures (HTTP 500).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience result type for app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound(task_id.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn already_terminal(task_id: impl Into<String>) -> Self {
        Self::AlreadyTerminal(task_id.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the HTTP status code for this error variant.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AlreadyTerminal(_) => StatusCode::CONFLICT,
            AppError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of an error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
