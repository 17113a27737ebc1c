#![allow(dead_code)]

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use tower::ServiceExt;

use garage_api::auth::password::PasswordHasher;
use garage_api::config::ServerConfig;
use garage_api::router::build_app_router;
use garage_api::state::AppState;
use garage_db::memory::MemoryStore;
use garage_db::models::customer::CreateCustomer;
use garage_db::models::user::{CreateUser, User};
use garage_db::store::CredentialStore;

/// Build a test `ServerConfig` with safe defaults and a fixed signing key.
pub fn test_config() -> ServerConfig {
    let secret = STANDARD.encode([7u8; 32]);
    ServerConfig::from_lookup(|key| match key {
        "HOST" => Some("127.0.0.1".to_string()),
        "PORT" => Some("0".to_string()),
        "JWT_SECRET" => Some(secret.clone()),
        _ => None,
    })
    .expect("test configuration must load")
}

/// Argon2id with minimal cost so tests stay fast.
pub fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(Params::new(8, 1, 1, None).expect("valid argon2 params"))
}

/// A running application backed by the in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Insert a user directly into the store with the given roles.
    pub async fn create_user(&self, username: &str, password: &str, roles: &[&str]) -> User {
        let password_hash = cheap_hasher().hash(password).expect("hashing should succeed");
        let (user, _) = self
            .store
            .create_customer(
                &CreateUser {
                    username: username.to_string(),
                    email: format!("{username}@garage.test"),
                    password_hash,
                    phone: None,
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                },
                &CreateCustomer {
                    first_name: username.to_string(),
                    last_name: "Tester".to_string(),
                    address: None,
                },
            )
            .await
            .expect("user creation should succeed");
        user
    }

    /// Log in through the HTTP API and return the access token.
    pub async fn login(&self, username: &str, password: &str) -> serde_json::Value {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = post_json(self.router.clone(), "/api/v1/auth/login", body).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK, "login must succeed");
        body_json(response).await
    }

    pub async fn access_token(&self, username: &str, password: &str) -> String {
        self.login(username, password).await["accessToken"]
            .as_str()
            .expect("accessToken must be a string")
            .to_string()
    }
}

/// Build the full application router with all middleware layers over a
/// fresh in-memory store.
///
/// Uses the same `build_app_router` as `main.rs` so integration tests
/// exercise the production middleware stack.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config.clone(), store.clone(), store.clone(), cheap_hasher());
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        store,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::builder().method(Method::GET).uri(uri), Body::empty()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}")),
        Body::empty(),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json"),
        Body::from(body.to_string()),
    )
    .await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}")),
        Body::from(body.to_string()),
    )
    .await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}")),
        Body::from(body.to_string()),
    )
    .await
}

async fn send(app: Router, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
    let request = builder.body(body).expect("request must build");
    app.oneshot(request).await.expect("router is infallible")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body must be JSON")
}
