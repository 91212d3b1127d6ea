//! HTTP routes
//!
//! The coordinator's HTTP surface is deliberately small: the WebSocket
//! upgrade and a liveness endpoint with coordinator stats.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::chat::ws_handler;
use crate::state::AppState;

/// Build the application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness check with coordinator statistics
async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.chat.stats().await;
    Json(json!({
        "status": "ok",
        "active_connections": stats.active_connections,
        "active_rooms": stats.active_rooms,
    }))
}
