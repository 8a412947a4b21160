// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use food_api::config::Config;
use food_api::db::Repositories;
use food_api::routes::create_router;
use food_api::services::{
    AuthService, LocalFileStorage, MemorySessionCache, TokenService,
};
use food_api::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "password";

/// Check if a MySQL test database is available via environment variable.
#[allow(dead_code)]
pub fn mysql_available() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Check if a Redis test server is available via environment variable.
#[allow(dead_code)]
pub fn redis_available() -> bool {
    std::env::var("TEST_REDIS_URL").is_ok()
}

/// Skip test with message if MySQL is not available.
#[macro_export]
macro_rules! require_mysql {
    () => {
        if !crate::common::mysql_available() {
            eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

/// Skip test with message if Redis is not available.
#[macro_export]
macro_rules! require_redis {
    () => {
        if !crate::common::redis_available() {
            eprintln!("⚠️  Skipping: TEST_REDIS_URL not set");
            return;
        }
    };
}

/// Create a test app backed by in-memory store and session cache.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let repositories = Repositories::memory();
    let tokens = TokenService::new(
        &config.jwt_signing_key,
        config.access_token_ttl,
        config.refresh_token_ttl,
    );
    let auth = AuthService::new(
        repositories.users.clone(),
        tokens,
        Arc::new(MemorySessionCache::new()),
    );
    let storage = LocalFileStorage::new(&config.upload_dir, &config.public_upload_url);

    let state = Arc::new(AppState {
        config,
        users: repositories.users,
        foods: repositories.foods,
        auth,
        storage: Arc::new(storage),
    });

    (create_router(state.clone()), state)
}

/// Send a request and return status plus parsed JSON body (Null if empty).
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Register a user and return its id.
#[allow(dead_code)]
pub async fn register(app: &Router, email: &str) -> u64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/users",
            serde_json::json!({
                "first_name": "Test",
                "last_name": "User",
                "email": email,
                "password": PASSWORD,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["id"].as_u64().unwrap()
}

/// Log in and return (access_token, refresh_token).
#[allow(dead_code)]
pub async fn login(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/login",
            serde_json::json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

pub const BOUNDARY: &str = "food-api-test-boundary";

/// Part of a multipart body: (name, optional (filename, content type), data).
pub type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build an authenticated multipart request.
#[allow(dead_code)]
pub fn multipart_request(method: &str, uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

/// Create a food with title and description, returning the response.
#[allow(dead_code)]
pub async fn create_food(app: &Router, token: &str, title: &str) -> (StatusCode, Value) {
    send(
        app,
        multipart_request(
            "POST",
            "/food",
            token,
            &[
                ("title", None, title.as_bytes()),
                ("description", None, b"food description"),
            ],
        ),
    )
    .await
}
