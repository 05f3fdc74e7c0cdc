//! `session_id` cookie layer.
//!
//! Every request gets a [`SessionId`] extension. A browser without the
//! cookie is issued a fresh id, which keys its handle in the session pool.
//! Client-supplied `x-user-*` headers are dropped here for every route.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use crate::AppState;
use crate::middleware::auth::strip_identity_headers;
use crate::services::cookies::{SESSION_COOKIE, session_cookie};

const SESSION_ID_LEN: usize = 32;

/// Per-browser correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn generate_session_id() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

pub async fn ensure_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    strip_identity_headers(request.headers_mut());

    if let Some(existing) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
        && !existing.is_empty()
    {
        request.extensions_mut().insert(SessionId(existing));
        return next.run(request).await;
    }

    let id = generate_session_id();
    request.extensions_mut().insert(SessionId(id.clone()));
    let response = next.run(request).await;
    let jar = jar.add(session_cookie(&id, state.config.secure_cookies));
    (jar, response).into_response()
}
