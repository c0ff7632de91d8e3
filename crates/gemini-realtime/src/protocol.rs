//! JSON envelopes exchanged with the Live API.
//!
//! The relay treats almost every frame as opaque. Only three shapes matter:
//! `toolCall` (intercepted), `toolResponse` (constructed locally) and
//! `serverContent` turn signals (observed, then forwarded). `setup` can
//! optionally be amended with tool declarations.

use crate::declaration::ToolGroup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// One entry of `toolCall.functionCalls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub function_calls: Vec<FunctionCall>,
}

/// `{ "output": ... }` or `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionResponsePayload {
    Output(Value),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: FunctionResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// Client-to-server envelopes built by the relay itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    ToolResponse(ToolResponse),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }
}

/// What the relay needs to know about a server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// A batch of function calls to answer locally.
    ToolCall(ToolCall),
    /// A content frame that ends or interrupts the model turn.
    TurnEnded,
    /// Anything else; forward untouched.
    Passthrough,
}

// Deserialized lazily: unknown fields (including the potentially large
// `modelTurn` audio parts) are skipped without allocation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    tool_call: Option<ToolCall>,
    server_content: Option<ServerContentSignals>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContentSignals {
    #[serde(default)]
    turn_complete: bool,
    #[serde(default)]
    interrupted: bool,
}

const TOOL_CALL_MARKER: &[u8] = b"\"toolCall\"";
const TURN_COMPLETE_MARKER: &[u8] = b"\"turnComplete\"";
const INTERRUPTED_MARKER: &[u8] = b"\"interrupted\"";

/// Classifies a text or binary payload received from upstream.
///
/// Payloads that carry none of the interesting keys are never parsed. A
/// payload that carries them but fails to parse yields
/// `ProtocolError::MalformedFrame`; callers forward it unmodified.
pub fn inspect_server_frame(payload: &[u8]) -> Result<ServerFrame, ProtocolError> {
    if !looks_like_json_object(payload) {
        return Ok(ServerFrame::Passthrough);
    }
    let has_tool_call = contains(payload, TOOL_CALL_MARKER);
    if !has_tool_call
        && !contains(payload, TURN_COMPLETE_MARKER)
        && !contains(payload, INTERRUPTED_MARKER)
    {
        return Ok(ServerFrame::Passthrough);
    }

    let message: ServerMessage = serde_json::from_slice(payload)
        .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

    if let Some(call) = message.tool_call {
        return Ok(ServerFrame::ToolCall(call));
    }
    if has_tool_call {
        return Err(ProtocolError::MalformedFrame("toolCall is null".to_string()));
    }
    match message.server_content {
        Some(signals) if signals.turn_complete || signals.interrupted => Ok(ServerFrame::TurnEnded),
        _ => Ok(ServerFrame::Passthrough),
    }
}

/// Adds `group` as `setup.tools` when `payload` is a setup envelope that does
/// not declare any tools. Returns `None` when the payload should be forwarded
/// as is.
pub fn inject_tool_declarations(payload: &str, group: &ToolGroup) -> Option<String> {
    if !payload.contains("\"setup\"") {
        return None;
    }
    let mut value: Value = serde_json::from_str(payload).ok()?;
    let setup = value.get_mut("setup")?.as_object_mut()?;
    if setup.contains_key("tools") {
        return None;
    }
    setup.insert("tools".to_string(), serde_json::to_value(vec![group]).ok()?);
    serde_json::to_string(&value).ok()
}

fn looks_like_json_object(payload: &[u8]) -> bool {
    payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
