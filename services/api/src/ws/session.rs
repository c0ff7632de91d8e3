//! Accepts downstream WebSocket connections and hands them to the supervisor.

use super::{
    frame::{BoxTransport, Framed},
    upstream::Handshake,
};
use crate::{handlers::ApiError, state::AppState};
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, header::SEC_WEBSOCKET_PROTOCOL},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// The client's Gemini API key, used for its own upstream session.
    pub key: Option<String>,
}

/// Axum handler to upgrade an HTTP connection to a relayed Live session.
///
/// The credential travels as the `key` query parameter, like the Live API's
/// own endpoint. When the client offers sub-protocols, the first one is
/// selected and the same token is requested from the upstream.
pub async fn ws_handler(
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(api_key) = params.key.filter(|k| !k.trim().is_empty()) else {
        warn!("Rejected WebSocket connection without an API key.");
        return ApiError::BadRequest(
            "Missing API key. Connect with ?key=<your Gemini API key>; it is used to open the upstream Live session."
                .to_string(),
        )
        .into_response();
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let protocol = headers
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .and_then(negotiated_protocol);
    let ws = match &protocol {
        Some(selected) => ws.protocols([selected.clone()]),
        None => ws,
    };

    let handshake = Handshake { api_key, protocol };
    ws.on_upgrade(move |socket| handle_socket(socket, state, handshake))
}

/// Main handler for an individual WebSocket connection.
///
/// Registers the session, then runs its relay until either side goes away.
/// The session is unregistered however the relay ends.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, handshake: Handshake) {
    let guard = state.supervisor.open(handshake.protocol.clone());
    tracing::Span::current().record("session_id", tracing::field::display(guard.session().id()));
    info!(
        protocol = ?handshake.protocol,
        live_sessions = state.supervisor.len(),
        "New WebSocket connection."
    );

    let downstream: BoxTransport = Box::new(Framed::<_, Message>::new(socket));
    state
        .supervisor
        .serve(
            guard,
            downstream,
            handshake,
            state.connector.clone(),
            state.dispatcher.clone(),
            state.relay_settings(),
        )
        .await;
    info!("WebSocket session finished.");
}

/// The sub-protocol selected from a client's offer: its first non-empty token.
fn negotiated_protocol(offered: &str) -> Option<String> {
    offered
        .split(',')
        .map(str::trim)
        .find(|p| !p.is_empty())
        .map(str::to_owned)
}
