//! HTTP and WebSocket request handlers.

pub mod messages;
pub mod stats;
pub mod threads;
pub mod users;
pub mod ws;

use uuid::Uuid;

use crate::http::error::AppError;

/// Parse a UUID path parameter, returning a 400 on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}
