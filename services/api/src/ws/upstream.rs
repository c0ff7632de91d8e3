//! Opening the upstream side of a session.

use super::frame::{BoxTransport, Framed};
use crate::error::RelayError;
use async_trait::async_trait;
use std::fmt;
use tokio_tungstenite::tungstenite::Message;

/// What the downstream client presented when it connected.
#[derive(Clone)]
pub struct Handshake {
    pub api_key: String,
    /// `Sec-WebSocket-Protocol` token, passed through unchanged.
    pub protocol: Option<String>,
}

impl fmt::Debug for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("api_key", &"***")
            .field("protocol", &self.protocol)
            .finish()
    }
}

#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self, handshake: &Handshake) -> Result<BoxTransport, RelayError>;
}

/// Connects to the Gemini Live endpoint with the client's own key.
pub struct GeminiConnector {
    endpoint: String,
}

impl GeminiConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl UpstreamConnector for GeminiConnector {
    async fn connect(&self, handshake: &Handshake) -> Result<BoxTransport, RelayError> {
        let stream = gemini_realtime::client::connect(
            &self.endpoint,
            &handshake.api_key,
            handshake.protocol.as_deref(),
        )
        .await
        .map_err(|e| RelayError::UpstreamUnavailable(e.to_string()))?;
        Ok(Box::new(Framed::<_, Message>::new(stream)))
    }
}
