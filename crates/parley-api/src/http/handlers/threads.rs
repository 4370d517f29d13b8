//! Thread CRUD and settings handlers.
//!
//! Endpoints:
//! - POST   /api/v1/threads               - Create a thread
//! - GET    /api/v1/threads               - List the caller's threads
//! - GET    /api/v1/threads/{id}          - Get one thread
//! - PATCH  /api/v1/threads/{id}          - Rename, change language or web search
//! - DELETE /api/v1/threads/{id}          - Delete a thread and its messages
//! - GET    /api/v1/threads/{id}/summary  - Latest rolling summary

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::chat::{ConversationSummary, CreateThreadRequest, Thread};
use parley_types::language::Language;

use super::parse_uuid;
use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Partial update for a thread. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateThreadBody {
    pub title: Option<String>,
    pub language: Option<Language>,
    pub web_search_enabled: Option<bool>,
}

/// POST /api/v1/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<CreateThreadRequest>,
) -> Result<Json<ApiResponse<Thread>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let thread = state.threads.create_thread(caller, body).await?;
    let self_link = format!("/api/v1/threads/{}", thread.id);
    let messages_link = format!("/api/v1/threads/{}/messages", thread.id);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(thread, request_id, elapsed)
            .with_link("self", &self_link)
            .with_link("messages", &messages_link),
    ))
}

/// GET /api/v1/threads
pub async fn list_threads(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ApiResponse<Vec<Thread>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let threads = state.threads.list_threads(caller).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(threads, request_id, elapsed)))
}

/// GET /api/v1/threads/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Thread>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id = parse_uuid(&id)?;

    let thread = state.threads.get_thread(caller, conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(thread, request_id, elapsed)))
}

/// PATCH /api/v1/threads/{id}
///
/// Fields apply in order: title, language, web search. A locked language
/// fails the request after the title has already been saved.
pub async fn update_thread(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<UpdateThreadBody>,
) -> Result<Json<ApiResponse<Thread>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id = parse_uuid(&id)?;

    let mut thread = state.threads.get_thread(caller, conversation_id).await?;
    if let Some(title) = body.title.as_deref() {
        thread = state.threads.rename_thread(caller, conversation_id, title).await?;
    }
    if let Some(language) = body.language {
        thread = state.threads.set_language(caller, conversation_id, language).await?;
    }
    if let Some(enabled) = body.web_search_enabled {
        thread = state.threads.set_web_search(caller, conversation_id, enabled).await?;
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(thread, request_id, elapsed)))
}

/// DELETE /api/v1/threads/{id}
pub async fn delete_thread(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id = parse_uuid(&id)?;

    state.threads.delete_thread(caller, conversation_id).await?;
    state.sessions.forget_conversation(conversation_id);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true, "id": conversation_id }),
        request_id,
        elapsed,
    )))
}

/// GET /api/v1/threads/{id}/summary
///
/// `data` is null until the first reply has been summarized.
pub async fn get_summary(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<ConversationSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id = parse_uuid(&id)?;

    let summary = state.threads.summary(caller, conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(summary, request_id, elapsed)))
}
