//! Axum Handlers for the REST API
//!
//! Read-only views of the relay: the advertised tool declarations, the live
//! sessions, and a liveness probe.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use gemini_realtime::ToolGroup;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::{state::AppState, ws::lifecycle::SessionSummary};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

/// The declaration group clients put in their `setup.tools`.
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolGroup> {
    Json(state.registry.declarations())
}

/// Every live session with its lifecycle state.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.supervisor.list())
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": state.supervisor.len(),
        "tools": state.registry.len(),
    }))
}
