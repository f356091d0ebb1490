#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use gatehouse::config::cors::CorsConfig;
use gatehouse::config::email::EmailConfig;
use gatehouse::config::token::TokenConfig;
use gatehouse::registry::{MemoryStore, RegistryStore};
use gatehouse::router::init_router;
use gatehouse::state::{AppState, ensure_admin};

pub const ADMIN_PASSWORD: &str = "hans";

pub fn default_tokens() -> TokenConfig {
    TokenConfig {
        secret: "integration-test-secret".to_string(),
        expiration: 3600,
        refresh: 900,
        reset_expiration: 3600,
    }
}

/// Short lifetimes for the expiry and sliding-refresh tests, which have to
/// wait the session out in real time.
pub fn short_lived_tokens() -> TokenConfig {
    TokenConfig {
        expiration: 2,
        refresh: 1,
        ..default_tokens()
    }
}

fn test_email_config() -> EmailConfig {
    EmailConfig {
        enabled: false,
        smtp_host: "localhost".to_string(),
        smtp_port: 1025,
        smtp_username: String::new(),
        smtp_password: String::new(),
        from_email: "noreply@test.local".to_string(),
        from_name: "Gatehouse".to_string(),
    }
}

pub async fn setup() -> (Router, AppState) {
    setup_with(default_tokens()).await
}

/// In-memory app with the bootstrap admin seeded.
pub async fn setup_with(token_config: TokenConfig) -> (Router, AppState) {
    let store: Arc<dyn RegistryStore> = Arc::new(MemoryStore::new());
    ensure_admin(store.as_ref(), ADMIN_PASSWORD)
        .await
        .expect("admin bootstrap");

    let state = AppState {
        store,
        token_config,
        email_config: test_email_config(),
        cors_config: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    };
    (init_router(state.clone()), state)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, bearer, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    send(app, Method::POST, uri, bearer, body).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    send(app, Method::PUT, uri, bearer, body).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// GET /login with query credentials; returns status and parsed body.
pub async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    let response = get(
        app,
        &format!("/login?username={username}&password={password}"),
        None,
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, "admin", ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// POST /roles as the given administrator token.
pub async fn create_principal(
    app: &Router,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = post(app, "/roles", Some(token), Some(body)).await;
    let status = response.status();
    (status, body_json(response).await)
}
