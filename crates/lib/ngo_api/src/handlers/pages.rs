//! Admin page shells. The real UI is served elsewhere; these exist so the
//! edge gate has something to protect.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::services::cookies;

const ADMIN_HOME: &str = "/admin";

fn shell(title: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><div id=\"root\" data-page=\"{title}\"></div></body></html>"
    ))
}

/// `GET /admin/login`: public; an authenticated visitor goes to the dashboard.
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let authenticated = cookies::token_from(&jar)
        .and_then(|t| state.tokens.verify(t))
        .is_some();
    if authenticated {
        return Redirect::to(ADMIN_HOME).into_response();
    }
    shell("Admin Login").into_response()
}

/// `GET /admin` and `GET /admin/{*path}`, behind the edge gate.
pub async fn dashboard_page() -> Html<String> {
    shell("Admin Dashboard")
}
