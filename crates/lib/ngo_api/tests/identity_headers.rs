//! `x-user-*` headers reaching handlers come from the gate, never the client.

mod common;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, body::Body};
use common::*;
use ngo_api::middleware::auth::{
    USER_ID_HEADER, USER_NAME_HEADER, USER_ROLE_HEADER, require_admin,
};
use ngo_api::middleware::session::ensure_session;
use serde_json::{Value, json};

async fn echo_identity(headers: HeaderMap) -> Json<Value> {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({
        "id": get(USER_ID_HEADER),
        "role": get(USER_ROLE_HEADER),
        "name": get(USER_NAME_HEADER),
        "ids": headers.get_all(USER_ID_HEADER).iter().count(),
    }))
}

fn echo_app(state: ngo_api::AppState) -> Router {
    Router::new()
        .route(
            "/gated",
            get(echo_identity).route_layer(from_fn_with_state(state.clone(), require_admin)),
        )
        .route("/open", get(echo_identity))
        .layer(from_fn_with_state(state.clone(), ensure_session))
        .with_state(state)
}

fn forged(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
    let mut req = request("GET", uri, cookie, None);
    let headers = req.headers_mut();
    headers.insert(USER_ID_HEADER, "forged-id".parse().unwrap());
    headers.insert(USER_ROLE_HEADER, "super_admin".parse().unwrap());
    headers.insert(USER_NAME_HEADER, "mallory".parse().unwrap());
    req
}

#[tokio::test]
async fn gated_handler_sees_gate_identity_not_forged_headers() {
    let (app, state) = app().await;
    let moderator_id = add_user(&state, "zara", "moderator").await;
    let cookie = login(&app, "zara", "password1").await;

    let echo = echo_app(state);
    let resp = send(&echo, forged("/gated", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["id"], moderator_id);
    assert_eq!(json["role"], "moderator");
    assert_eq!(json["name"], "zara");
    assert_eq!(json["ids"], 1);
}

#[tokio::test]
async fn ungated_routes_drop_client_identity_headers() {
    let (_, state) = app().await;
    let echo = echo_app(state);

    let resp = send(&echo, forged("/open", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["id"], Value::Null);
    assert_eq!(json["role"], Value::Null);
    assert_eq!(json["name"], Value::Null);
}

#[tokio::test]
async fn forged_headers_without_token_are_unauthorized() {
    let (_, state) = app().await;
    let echo = echo_app(state);
    let resp = send(&echo, forged("/gated", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
