//! HTTP and WebSocket layer for Parley.
//!
//! Axum REST API at `/api/v1/` using the envelope response format, plus the
//! `/ws` endpoint that carries room commands and server events.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
