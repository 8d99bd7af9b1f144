//! Backend gateway integration tests
//!
//! These tests run `HttpGateway` against a stand-in backend served by axum
//! on an ephemeral port, covering the request shapes and the mapping of
//! backend status codes onto `GatewayError`.

use axum::{
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use linkdash::analytics::{AnalyticsView, Granularity, RawTimestamp, ViewSettings, ViewSnapshot};
use linkdash::config::BackendConfig;
use linkdash::gateway::{GatewayError, HttpGateway, LinkGateway};
use linkdash::models::RegisterRequest;
use linkdash::session::{Credential, CredentialStore, SessionContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const TOKEN: &str = "tok-alice";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

async fn login(Form(form): Form<HashMap<String, String>>) -> Response {
    let username = form.get("username").map(String::as_str);
    let password = form.get("password").map(String::as_str);
    if username == Some("alice") && password == Some("password123") {
        Json(json!({"access_token": TOKEN, "token_type": "bearer"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    match body["username"].as_str() {
        Some("taken") => StatusCode::CONFLICT.into_response(),
        Some(_) => (StatusCode::CREATED, Json(json!({"username": body["username"]}))).into_response(),
        None => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"username": "alice", "full_name": "Alice A."})).into_response()
}

async fn list_urls(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"short": "abc", "url": "https://example.com/a", "created_at": "2024-01-04T08:00:00"},
        {"short": "xyz", "url": "https://example.com/x", "created_at": "2024-01-03T08:00:00"}
    ]))
    .into_response()
}

async fn create_url(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let url = body["url"].as_str().unwrap_or_default();
    if !url.starts_with("http") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "Invalid URL"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({"short": "new1", "url": url, "created_at": "2024-01-06T09:00:00"})),
    )
        .into_response()
}

async fn redirects(headers: HeaderMap, Path(short): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match short.as_str() {
        "abc" => Json(json!([
            "2024-01-05T10:00:00+00:00",
            "2024-01-05T23:50:00+00:00",
            "2024-01-06T00:05:00+00:00"
        ]))
        .into_response(),
        "xyz" => Json(json!(["2024-01-05T10:00:00+00:00", "garbage"])).into_response(),
        "odd/../code?x" => Json(json!(["2024-01-05T10:00:00+00:00"])).into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Link not found"}))).into_response(),
    }
}

/// Start the stand-in backend and return its base URL
async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/register", post(register))
        .route("/api/me", get(me))
        .route("/api/me/urls", get(list_urls).post(create_url))
        .route("/api/me/links/{short}/redirects", get(redirects));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn gateway_for(base_url: &str) -> HttpGateway {
    HttpGateway::from_config(&BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_login() {
    let gateway = gateway_for(&spawn_backend().await);

    let credential = gateway.login("alice", "password123").await.unwrap();
    assert_eq!(credential.token(), TOKEN);

    let err = gateway.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err, GatewayError::Unauthorized);
}

#[tokio::test]
async fn test_register() {
    let gateway = gateway_for(&spawn_backend().await);

    let request = RegisterRequest {
        username: "bob".to_string(),
        password: "password123".to_string(),
        full_name: None,
    };
    gateway.register(&request).await.unwrap();

    let taken = RegisterRequest {
        username: "taken".to_string(),
        ..request
    };
    assert_eq!(gateway.register(&taken).await.unwrap_err(), GatewayError::Conflict);
}

#[tokio::test]
async fn test_authorized_reads() {
    let gateway = gateway_for(&spawn_backend().await);
    let credential = Credential::new(TOKEN);

    let user = gateway.fetch_user(&credential).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.full_name.as_deref(), Some("Alice A."));

    let links = gateway.fetch_links(&credential).await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].short, "abc");

    let stale = Credential::new("expired");
    assert_eq!(
        gateway.fetch_links(&stale).await.unwrap_err(),
        GatewayError::Unauthorized
    );
}

#[tokio::test]
async fn test_create_link() {
    let gateway = gateway_for(&spawn_backend().await);
    let credential = Credential::new(TOKEN);

    let link = gateway
        .create_link(&credential, "https://example.com/new")
        .await
        .unwrap();
    assert_eq!(link.short, "new1");
    assert_eq!(link.url, "https://example.com/new");

    let err = gateway.create_link(&credential, "nope").await.unwrap_err();
    assert_eq!(err, GatewayError::Rejected("Invalid URL".to_string()));
}

#[tokio::test]
async fn test_redirect_events_and_errors() {
    let gateway = gateway_for(&spawn_backend().await);
    let credential = Credential::new(TOKEN);

    let events = gateway.fetch_redirect_events("abc", &credential).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        RawTimestamp::Text("2024-01-05T10:00:00+00:00".to_string())
    );

    assert_eq!(
        gateway
            .fetch_redirect_events("missing", &credential)
            .await
            .unwrap_err(),
        GatewayError::NotFound
    );
    assert!(matches!(
        gateway.fetch_redirect_events("broken", &credential).await,
        Err(GatewayError::NetworkFailure(_))
    ));
}

#[tokio::test]
async fn test_short_code_is_sent_as_one_path_segment() {
    let gateway = gateway_for(&spawn_backend().await);
    let credential = Credential::new(TOKEN);

    let events = gateway
        .fetch_redirect_events("odd/../code?x", &credential)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);

    assert_eq!(
        gateway
            .fetch_redirect_events("..", &credential)
            .await
            .unwrap_err(),
        GatewayError::NotFound
    );
}

#[tokio::test]
async fn test_link_metadata_lookup() {
    let gateway = gateway_for(&spawn_backend().await);
    let credential = Credential::new(TOKEN);

    let link = gateway.fetch_link_metadata("xyz", &credential).await.unwrap();
    assert_eq!(link.url, "https://example.com/x");

    assert_eq!(
        gateway
            .fetch_link_metadata("missing", &credential)
            .await
            .unwrap_err(),
        GatewayError::NotFound
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    // Grab a free port and close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = gateway_for(&format!("http://{addr}"));
    let err = gateway
        .fetch_links(&Credential::new(TOKEN))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NetworkFailure(_)));
}

#[tokio::test]
async fn test_analytics_view_over_http() {
    let gateway: Arc<dyn LinkGateway> = Arc::new(gateway_for(&spawn_backend().await));
    let session = SessionContext::anonymous(CredentialStore::in_memory());
    session.login(Credential::new(TOKEN)).await.unwrap();

    let view = AnalyticsView::new(gateway, Arc::new(session), Utc, ViewSettings::default());

    view.mount("abc").await;
    view.set_granularity(Granularity::Day);
    let series: Vec<(String, u64)> = view
        .series()
        .unwrap()
        .into_iter()
        .map(|p| (p.label, p.count))
        .collect();
    assert_eq!(
        series,
        vec![("2024-1-5".to_string(), 2), ("2024-1-6".to_string(), 1)]
    );

    // One malformed timestamp fails the whole batch
    let snapshot = view.mount("xyz").await;
    match snapshot {
        ViewSnapshot::Error { short_code, error, .. } => {
            assert_eq!(short_code, "xyz");
            assert!(error.contains("invalid timestamp at index 1"), "{error}");
        }
        other => panic!("expected error snapshot, got {:?}", other),
    }
}
