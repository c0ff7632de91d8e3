use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use live_relay_api::{
    config::Config, router::create_router, state::AppState, tools::build_registry,
    ws::upstream::GeminiConnector,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    let config = Config::default();
    let registry = build_registry(&config).unwrap();
    let connector = Arc::new(GeminiConnector::new("ws://127.0.0.1:9/live"));
    create_router(Arc::new(AppState::new(config, registry, connector)))
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn tools_endpoint_returns_the_declaration_group() {
    let (status, body) = get("/tools").await;
    assert_eq!(status, StatusCode::OK);

    let declarations = body["functionDeclarations"].as_array().unwrap();
    assert_eq!(declarations[0]["name"], "get_location_info");
    assert_eq!(declarations[0]["parameters"]["type"], "object");
    assert_eq!(
        declarations[0]["parameters"]["required"],
        serde_json::json!(["query", "region"])
    );
}

#[tokio::test]
async fn health_reports_counts() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["tools"], 3);
}

#[tokio::test]
async fn sessions_start_empty() {
    let (status, body) = get("/sessions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

fn upgrade_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn websocket_without_key_is_rejected_with_an_explanation() {
    for uri in ["/ws", "/ws?key=", "/ws?key=%20"] {
        let response = app().oneshot(upgrade_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("Missing API key"));
    }
}

#[tokio::test]
async fn keyed_request_reaches_the_upgrade() {
    // Outside a real server there is no connection to take over, so the
    // upgrade itself is refused once the key check has passed.
    let response = app().oneshot(upgrade_request("/ws?key=abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}
