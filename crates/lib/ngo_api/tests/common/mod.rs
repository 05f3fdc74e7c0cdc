//! Shared harness: an in-memory app with a seeded SUPER_ADMIN `admin/admin123`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use ngo_api::config::ApiConfig;
use ngo_api::{AppState, router};
use ngo_core::auth::jwt::TokenCodec;
use ngo_core::auth::repository::InMemoryUserRepository;
use ngo_core::auth::store::UserStore;
use ngo_core::content::connector::ContentConnector;
use ngo_core::models::auth::NewUser;
use ngo_core::pool::SessionPool;
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &[u8] = b"integration-test-secret";
pub const TTL_SECS: i64 = 86_400;

pub fn config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        jwt_secret: String::from_utf8_lossy(SECRET).into_owned(),
        token_ttl_secs: TTL_SECS,
        session_idle_timeout: Duration::from_secs(30),
        session_max_connections: 1,
        secure_cookies: false,
        seed_admin: None,
    }
}

pub async fn state() -> AppState {
    let users = UserStore::new(Arc::new(InMemoryUserRepository::new())).with_hash_cost(4);
    users
        .seed_admin("admin", "admin123")
        .await
        .expect("seed admin");
    AppState {
        users,
        tokens: TokenCodec::new(SECRET, TTL_SECS).expect("codec"),
        sessions: SessionPool::new(ContentConnector::memory()),
        config: config(),
    }
}

pub async fn app() -> (Router, AppState) {
    let state = state().await;
    (router(state.clone()), state)
}

/// Create a principal directly in the store and return its id.
pub async fn add_user(state: &AppState, username: &str, role: &str) -> String {
    state
        .users
        .create_user(NewUser {
            username: Some(username.into()),
            password: Some("password1".into()),
            first_name: Some("Test".into()),
            last_name: Some("User".into()),
            email: Some(format!("{username}@example.org")),
            role: Some(role.into()),
            ..Default::default()
        })
        .await
        .expect("create user")
        .id
}

pub fn request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request")
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// `Set-Cookie` headers of a response.
pub fn set_cookies(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the cookie `name` set by the response, if any.
pub fn cookie_value(resp: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(resp).into_iter().find_map(|c| {
        let first = c.split(';').next()?;
        let (k, v) = first.split_once('=')?;
        (k.trim() == name).then(|| v.trim().to_string())
    })
}

/// Log in and return a `Cookie` header value carrying the session token.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let resp = send(
        app,
        request(
            "POST",
            "/api/admin/login",
            None,
            Some(serde_json::json!({"username": username, "password": password})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK, "login as {username}");
    let jwt = cookie_value(&resp, "jwt").expect("jwt cookie");
    format!("jwt={jwt}")
}
