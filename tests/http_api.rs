use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
    response::Response,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use turnsync_back::{
    config::StoreEndpointConfig,
    dao::registry::StoreRegistry,
    routes,
    services::{
        store_api::{GameStoreApi, UpsertMode},
        viewer::JsonSessionViewer,
    },
    state::AppState,
};

const ADMIN_TOKEN: &str = "test-admin-token";

fn sqlite_app(dir: &TempDir) -> Router {
    let endpoints = StoreEndpointConfig {
        sqlite_path: Some(dir.path().join("data").join("games.db")),
        ..Default::default()
    };
    let registry = StoreRegistry::new(endpoints).unwrap();
    let store = GameStoreApi::new(Arc::new(registry), UpsertMode::Atomic);
    routes::router(AppState::new(
        store,
        Arc::new(JsonSessionViewer),
        Some(ADMIN_TOKEN.into()),
    ))
}

async fn send_with_token(
    app: &Router,
    method: Method,
    uri: &str,
    body: &str,
    token: Option<&str>,
) -> Response {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "text/plain");
    if let Some(token) = token {
        request = request.header("x-admin-token", token);
    }
    let request = request.body(Body::from(body.to_owned())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, body: &str) -> Response {
    send_with_token(app, method, uri, body, Some(ADMIN_TOKEN)).await
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn game(version: u64, active: &str) -> String {
    json!({
        "stateVersion": version,
        "activePlayerId": active,
        "players": [
            { "id": "P1", "secret": "s1" },
            { "id": "P2", "secret": "s2" }
        ],
        "pendingInputs": { "P2": ["pick"] }
    })
    .to_string()
}

#[tokio::test]
async fn test_embedded_store_keeps_latest_save() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);

    let saved = send(&app, Method::PUT, "/games/v2:abc", "{state:1}").await;
    assert_eq!(saved.status(), StatusCode::NO_CONTENT);
    let loaded = send(&app, Method::GET, "/games/v2:abc", "").await;
    assert_eq!(loaded.status(), StatusCode::OK);
    assert_eq!(body_text(loaded).await, "{state:1}");

    send(&app, Method::PUT, "/games/v2:abc", "{state:2}").await;
    let loaded = send(&app, Method::GET, "/games/v2:abc", "").await;
    assert_eq!(body_text(loaded).await, "{state:2}");

    assert!(dir.path().join("data").join("games.db").exists());
}

#[tokio::test]
async fn test_legacy_ids_fall_back_to_embedded_store() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);

    let saved = send(&app, Method::PUT, "/games/abc", "{legacy:true}").await;
    assert_eq!(saved.status(), StatusCode::NO_CONTENT);
    let loaded = send(&app, Method::GET, "/games/abc", "").await;
    assert_eq!(body_text(loaded).await, "{legacy:true}");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);

    let response = send(&app, Method::GET, "/games/v2:missing", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_mints_v2_id() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);

    let created = send(&app, Method::POST, "/games", &game(1, "P1")).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_str(&body_text(created).await).unwrap();
    let id = body["sessionId"].as_str().unwrap().to_owned();
    assert!(id.starts_with("v2:"));

    let loaded = send(&app, Method::GET, &format!("/games/{id}"), "").await;
    assert_eq!(body_text(loaded).await, game(1, "P1"));

    let empty = send(&app, Method::POST, "/games", "   ").await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_endpoint_answers_polls() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);
    send(&app, Method::PUT, "/games/v2:s", &game(3, "P1")).await;

    let fresh = send(
        &app,
        Method::GET,
        "/sync?sessionId=v2:s&playerId=P2&playerSecret=s2",
        "",
    )
    .await;
    assert_eq!(fresh.status(), StatusCode::OK);
    let text = body_text(fresh).await;
    assert!(!text.contains("secret"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["stateVersion"], 3);
    assert_eq!(body["viewingPlayer"]["id"], "P2");
    assert_eq!(body["pendingInputs"], json!(["pick"]));
    assert_eq!(body["game"]["activePlayerId"], "P1");

    let current = send(
        &app,
        Method::GET,
        "/sync?sessionId=v2:s&playerId=P2&playerSecret=s2&stateVersion=3",
        "",
    )
    .await;
    assert_eq!(current.status(), StatusCode::NOT_MODIFIED);

    let behind = send(
        &app,
        Method::GET,
        "/sync?sessionId=v2:s&playerId=P2&playerSecret=s2&stateVersion=2",
        "",
    )
    .await;
    assert_eq!(behind.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unversioned_payload_is_resent_after_turn_change() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);
    let unversioned = |active: &str| {
        json!({
            "activePlayerId": active,
            "players": [
                { "id": "P1", "secret": "s1" },
                { "id": "P2", "secret": "s2" }
            ]
        })
        .to_string()
    };
    send(&app, Method::PUT, "/games/v2:u", &unversioned("P1")).await;

    let first = send(
        &app,
        Method::GET,
        "/sync?sessionId=v2:u&playerId=P2&playerSecret=s2",
        "",
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(first).await).unwrap();
    assert!(body.get("stateVersion").is_none());
    assert_eq!(body["game"]["activePlayerId"], "P1");

    send(&app, Method::PUT, "/games/v2:u", &unversioned("P2")).await;

    for uri in [
        "/sync?sessionId=v2:u&playerId=P2&playerSecret=s2",
        "/sync?sessionId=v2:u&playerId=P2&playerSecret=s2&stateVersion=0",
    ] {
        let after = send(&app, Method::GET, uri, "").await;
        assert_eq!(after.status(), StatusCode::OK, "{uri}");
        let body: Value = serde_json::from_str(&body_text(after).await).unwrap();
        assert_eq!(body["game"]["activePlayerId"], "P2", "{uri}");
    }
}

#[tokio::test]
async fn test_game_routes_require_admin_token() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);
    send(&app, Method::PUT, "/games/v2:z", &game(1, "P1")).await;

    for token in [None, Some("wrong")] {
        let loaded = send_with_token(&app, Method::GET, "/games/v2:z", "", token).await;
        assert_eq!(loaded.status(), StatusCode::UNAUTHORIZED);
        let text = body_text(loaded).await;
        assert!(!text.contains("s1") && !text.contains("s2"), "{text}");

        let overwrite =
            send_with_token(&app, Method::PUT, "/games/v2:z", &game(9, "P2"), token).await;
        assert_eq!(overwrite.status(), StatusCode::UNAUTHORIZED);

        let created = send_with_token(&app, Method::POST, "/games", &game(1, "P1"), token).await;
        assert_eq!(created.status(), StatusCode::UNAUTHORIZED);
    }

    let loaded = send(&app, Method::GET, "/games/v2:z", "").await;
    assert_eq!(body_text(loaded).await, game(1, "P1"));

    // Players still poll with their own secret and no admin token.
    let polled = send_with_token(
        &app,
        Method::GET,
        "/sync?sessionId=v2:z&playerId=P1&playerSecret=s1",
        "",
        None,
    )
    .await;
    assert_eq!(polled.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_game_routes_locked_without_configured_token() {
    let dir = TempDir::new().unwrap();
    let endpoints = StoreEndpointConfig {
        sqlite_path: Some(dir.path().join("games.db")),
        ..Default::default()
    };
    let registry = StoreRegistry::new(endpoints).unwrap();
    let store = GameStoreApi::new(Arc::new(registry), UpsertMode::Atomic);
    let app = routes::router(AppState::new(store, Arc::new(JsonSessionViewer), None));

    let response = send(&app, Method::PUT, "/games/v2:x", "{}").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sync_endpoint_rejects_bad_requests() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);
    send(&app, Method::PUT, "/games/v2:s", &game(1, "P1")).await;

    let cases = [
        (
            "/sync?sessionId=v2:s&playerId=P2&playerSecret=wrong",
            StatusCode::UNAUTHORIZED,
        ),
        (
            "/sync?sessionId=v2:s&playerId=P9&playerSecret=s2",
            StatusCode::UNAUTHORIZED,
        ),
        (
            "/sync?sessionId=v2:nope&playerId=P2&playerSecret=s2",
            StatusCode::NOT_FOUND,
        ),
        (
            "/sync?sessionId=v2:s&playerId=&playerSecret=s2",
            StatusCode::BAD_REQUEST,
        ),
        ("/sync?sessionId=v2:s", StatusCode::BAD_REQUEST),
    ];

    for (uri, expected) in cases {
        let response = send(&app, Method::GET, uri, "").await;
        assert_eq!(response.status(), expected, "{uri}");
    }
}

#[tokio::test]
async fn test_healthcheck_reports_connected_backends() {
    let dir = TempDir::new().unwrap();
    let app = sqlite_app(&dir);

    let idle: Value =
        serde_json::from_str(&body_text(send(&app, Method::GET, "/healthcheck", "").await).await)
            .unwrap();
    assert_eq!(idle["status"], "ok");
    assert_eq!(idle["backends"], json!([]));

    send(&app, Method::PUT, "/games/v2:abc", "{}").await;
    let busy: Value =
        serde_json::from_str(&body_text(send(&app, Method::GET, "/healthcheck", "").await).await)
            .unwrap();
    assert_eq!(busy["backends"], json!([{ "kind": "sqlite", "healthy": true }]));
}
