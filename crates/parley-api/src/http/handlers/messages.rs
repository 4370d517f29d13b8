//! Message listing and reaction handlers.
//!
//! Endpoints:
//! - GET  /api/v1/threads/{id}/messages   - Messages in arrival order
//! - POST /api/v1/messages/{id}/reactions - Toggle a like or dislike

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::chat::{ChatMessage, ReactionKind};

use super::parse_uuid;
use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub kind: ReactionKind,
}

/// GET /api/v1/threads/{id}/messages
///
/// Each message carries the caller's own reaction in `user_reaction`.
pub async fn list_messages(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id = parse_uuid(&id)?;

    let messages = state.threads.messages(caller, conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(messages, request_id, elapsed)))
}

/// POST /api/v1/messages/{id}/reactions
///
/// Repeating the active reaction clears it. Every subscriber of the
/// conversation receives `message_updated` with the new tallies.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ReactionBody>,
) -> Result<Json<ApiResponse<ChatMessage>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let message_id = parse_uuid(&id)?;

    let message = state
        .sessions
        .react(None, message_id, caller, body.kind)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(message, request_id, elapsed)))
}
