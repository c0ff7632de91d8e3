//! Errors that end a relay session.
//!
//! Tool failures never show up here: the dispatcher turns them into failed
//! results that are sent back to the model.

use gemini_realtime::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The upstream could not be opened; the session closes with a
    /// non-normal code and the client is expected to retry with a fresh one.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<axum::Error> for RelayError {
    fn from(e: axum::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}
