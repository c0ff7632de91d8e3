//! Opens the upstream Live API WebSocket.

use crate::protocol::ProtocolError;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue},
};
use tracing::info;
use url::Url;

/// Default Live API endpoint. The API key is appended as the `key` query parameter.
pub const LIVE_API_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

pub type LiveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds the endpoint URL carrying the caller's credential.
pub fn endpoint_url(base: &str, api_key: &str) -> Result<Url, ProtocolError> {
    let mut url = Url::parse(base).map_err(|e| ProtocolError::InvalidEndpoint(e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ProtocolError::InvalidEndpoint(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// The endpoint with the credential masked, for logs.
pub fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

/// Connects to `base` with `api_key`, offering `protocol` (if any) in the
/// `Sec-WebSocket-Protocol` header unchanged.
pub async fn connect(
    base: &str,
    api_key: &str,
    protocol: Option<&str>,
) -> Result<LiveStream, ProtocolError> {
    let url = endpoint_url(base, api_key)?;
    let mut request = url.as_str().into_client_request()?;
    if let Some(protocol) = protocol {
        let value = HeaderValue::from_str(protocol)
            .map_err(|e| ProtocolError::InvalidEndpoint(format!("invalid sub-protocol: {e}")))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }

    let (stream, response) = connect_async(request).await?;
    info!(
        endpoint = %redacted(&url),
        status = %response.status(),
        "Connected to Gemini Live WebSocket."
    );
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_key_and_redacts_it() {
        let url = endpoint_url(LIVE_API_URL, "secret-key").unwrap();
        assert!(url.as_str().ends_with("BidiGenerateContent?key=secret-key"));

        let shown = redacted(&url);
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("key=***"));
    }

    #[test]
    fn rejects_non_websocket_endpoints() {
        assert!(matches!(
            endpoint_url("https://example.com/live", "k"),
            Err(ProtocolError::InvalidEndpoint(_))
        ));
        assert!(endpoint_url("not a url", "k").is_err());
    }
}
