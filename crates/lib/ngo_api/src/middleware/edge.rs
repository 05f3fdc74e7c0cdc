//! Edge gate for `/admin` pages.
//!
//! Pages only need to know that a valid token exists, so this gate checks
//! the signature and expiry without a user lookup. Anything else is sent to
//! the login page.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::services::cookies;

pub const LOGIN_PAGE: &str = "/admin/login";

pub async fn require_token(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let secure = state.config.secure_cookies;
    let claims = cookies::token_from(&jar).and_then(|t| state.tokens.verify(t));
    let Some(claims) = claims else {
        let jar = cookies::clear_auth(jar, secure);
        return (jar, Redirect::to(LOGIN_PAGE)).into_response();
    };

    let jar = cookies::with_identity(
        jar,
        &claims.user_id,
        claims.role.as_str(),
        &claims.username,
        secure,
    );
    let response = next.run(request).await;
    (jar, response).into_response()
}
