//! Axum Router Configuration
//!
//! This module defines the HTTP routing for the relay: the WebSocket endpoint
//! and a few read-only JSON views.

use crate::{handlers, state::AppState, ws::ws_handler};

use axum::{Router, routing::get};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/tools", get(handlers::list_tools))
        .route("/sessions", get(handlers::list_sessions))
        .route("/health", get(handlers::health))
        .with_state(app_state)
}
