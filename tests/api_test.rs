//! HTTP surface tests against the assembled router

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bingo_hall::{
    api::{middleware::REQUEST_ID_HEADER, ApiServer},
    config::{LobbyConfig, ServerConfig},
    LobbyRegistry,
};
use common::{config, Fixture};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app(fx: &Fixture) -> (Router, Arc<LobbyRegistry>) {
    let registry = Arc::new(LobbyRegistry::new(fx.ctx.clone()));
    let server = ApiServer::new(
        ServerConfig::default(),
        registry.clone(),
        fx.ctx.ledger.clone(),
        fx.metrics.clone(),
    );
    (server.create_app(), registry)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let fx = Fixture::with_draw(config(), vec![]);
    let (app, _) = app(&fx);

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_lobbies_listed_by_stake() {
    let lobby_config = LobbyConfig {
        stakes: vec![10, 20],
        ..config()
    };
    let fx = Fixture::with_draw(lobby_config, vec![]);
    fx.seed(&[(1, "alice", 100)]);
    let (app, registry) = app(&fx);
    registry.get(20).unwrap().select_card(1, 3).await.unwrap();

    let (status, body) = get(app.clone(), "/lobbies").await;
    assert_eq!(status, StatusCode::OK);
    let lobbies = body["lobbies"].as_array().unwrap();
    assert_eq!(lobbies.len(), 2);
    assert_eq!(lobbies[0]["stake"], 10);
    assert_eq!(lobbies[1]["selected_cards"], 1);

    let (status, body) = get(app, "/lobbies/20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["pot"], 16);
}

#[tokio::test]
async fn test_unknown_lobby_is_not_found_with_request_id() {
    let fx = Fixture::with_draw(config(), vec![]);
    let (app, _) = app(&fx);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/lobbies/999")
                .header(REQUEST_ID_HEADER, "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-42");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["request_id"], "req-42");
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_expose_engine_counters() {
    let fx = Fixture::with_draw(config(), vec![]);
    fx.metrics.record_round_started();
    let (app, _) = app(&fx);

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rounds_started"], 1);
    assert_eq!(body["messages_dropped"], 0);
    assert!(body["uptime_secs"].is_i64());
}
