//! Caller identity extractor.
//!
//! Identity comes from the `x-user-id` header, or from the `user_id` query
//! parameter for clients (such as browser WebSockets) that cannot set
//! headers. The value is trusted as-is.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf the request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Uuid);

#[derive(Debug, Deserialize)]
struct CallerQuery {
    user_id: Option<String>,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        caller_from_parts(parts).map(Caller)
    }
}

fn caller_from_parts(parts: &Parts) -> Result<Uuid, AppError> {
    if let Some(value) = parts.headers.get(USER_ID_HEADER) {
        let raw = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid x-user-id header encoding".to_string()))?;
        return parse_user_id(raw);
    }

    if let Ok(Query(query)) = Query::<CallerQuery>::try_from_uri(&parts.uri) {
        if let Some(raw) = query.user_id {
            return parse_user_id(&raw);
        }
    }

    Err(AppError::Unauthorized(
        "Missing caller. Provide a user id via the 'x-user-id' header or 'user_id' query parameter."
            .to_string(),
    ))
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid user id: {raw}")))
}
