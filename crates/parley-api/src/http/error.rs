//! Application error type mapping to HTTP status codes and the envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use parley_core::chat::thread::ThreadError;
use parley_core::session::SessionError;
use parley_types::error::RepositoryError;

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Thread(ThreadError),
    Session(SessionError),
    /// No caller identity on the request.
    Unauthorized(String),
    Validation(String),
    Internal(String),
}

impl From<ThreadError> for AppError {
    fn from(e: ThreadError) -> Self {
        AppError::Thread(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl AppError {
    /// Status, stable error code, and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Thread(ThreadError::NotFound)
            | AppError::Session(SessionError::ConversationNotFound) => (
                StatusCode::NOT_FOUND,
                "THREAD_NOT_FOUND",
                "Thread not found".to_string(),
            ),
            AppError::Session(SessionError::MessageNotFound) => (
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "Message not found".to_string(),
            ),
            AppError::Thread(ThreadError::Forbidden) | AppError::Session(SessionError::Forbidden) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Thread belongs to another user".to_string(),
            ),
            AppError::Thread(ThreadError::LanguageLocked) => (
                StatusCode::CONFLICT,
                "LANGUAGE_LOCKED",
                "Thread language cannot change once it has user messages".to_string(),
            ),
            AppError::Thread(ThreadError::Validation(msg))
            | AppError::Session(SessionError::Validation(msg))
            | AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Thread(ThreadError::Persistence(RepositoryError::NotFound))
            | AppError::Session(SessionError::Persistence(RepositoryError::NotFound)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            AppError::Thread(ThreadError::Persistence(e))
            | AppError::Session(SessionError::Persistence(e)) => {
                tracing::error!(error = %e, "persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    e.to_string(),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let request_id = uuid::Uuid::now_v7().to_string();
        (status, Json(ApiResponse::<()>::error(code, &message, request_id))).into_response()
    }
}
