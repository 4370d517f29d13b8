//! Server statistics handler.
//!
//! GET /api/v1/stats - Stored counts plus live connection figures.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let stats = state.threads.stats().await?;
    let rooms = state.sessions.rooms();

    let data = serde_json::json!({
        "users": stats.users,
        "threads": stats.threads,
        "messages": stats.messages,
        "translations": stats.translations,
        "connections": rooms.connection_count(),
        "active_rooms": rooms.room_count(),
        "backend": state.sessions.backend_name(),
    });

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(data, request_id, elapsed)))
}
