//! Caller profile handlers.
//!
//! Endpoints:
//! - GET /api/v1/users/me          - Profile, created on first request
//! - PUT /api/v1/users/me/language - Language for newly created threads

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use parley_types::chat::User;
use parley_types::language::Language;

use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LanguageBody {
    pub language: Language,
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user = state.threads.ensure_user(caller).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(user, request_id, elapsed)))
}

/// PUT /api/v1/users/me/language
pub async fn set_language(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<LanguageBody>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user = state
        .threads
        .set_preferred_language(caller, body.language)
        .await?;
    tracing::info!(user_id = %caller, language = %user.preferred_language, "preferred language updated");

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(user, request_id, elapsed)))
}
