//! Axum router configuration with middleware.
//!
//! REST routes live under `/api/v1/`; the session socket is `/ws`.
//! Middleware: CORS and request tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Threads
        .route(
            "/threads",
            post(handlers::threads::create_thread).get(handlers::threads::list_threads),
        )
        .route(
            "/threads/{id}",
            get(handlers::threads::get_thread)
                .patch(handlers::threads::update_thread)
                .delete(handlers::threads::delete_thread),
        )
        .route("/threads/{id}/summary", get(handlers::threads::get_summary))
        // Messages
        .route(
            "/threads/{id}/messages",
            get(handlers::messages::list_messages),
        )
        .route(
            "/messages/{id}/reactions",
            post(handlers::messages::toggle_reaction),
        )
        // Users
        .route("/users/me", get(handlers::users::get_me))
        .route("/users/me/language", put(handlers::users::set_language))
        // Stats
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness check (no caller required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
