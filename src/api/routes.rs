//! Route definitions

use super::{handlers::*, websocket::lobby_websocket_handler};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/lobbies", get(lobbies_handler))
        .route("/lobbies/:stake", get(lobby_handler))
        .route("/metrics", get(metrics_handler))
        // one socket per player and lobby
        .route("/ws/:stake", get(lobby_websocket_handler))
        .with_state(state)
}
