//! Admin authentication handlers.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use ngo_core::models::auth::{AdminUser, Role};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::handlers::{ApiResponse, ok, ok_with};
use crate::middleware::auth::AdminContext;
use crate::services::{auth, cookies};

/// Fields are optional so a missing one is reported by name.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: AdminUser,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub success: bool,
    pub authenticated: bool,
    pub user_id: String,
    pub role: Role,
}

/// `POST /api/admin/login`: set the session and identity cookies.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let outcome = auth::login(&state, &body.username, &body.password).await?;
    let jar = auth::login_cookies(&state, jar, &outcome);
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: outcome.user,
            message: "Login successful".into(),
        }),
    ))
}

/// `POST /api/admin/logout`: clear every auth cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let jar = cookies::clear_auth(jar, state.config.secure_cookies);
    (jar, ok_with((), "Logged out successfully"))
}

/// `GET /api/admin/auth/check`
pub async fn auth_check_handler(
    Extension(ctx): Extension<AdminContext>,
) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        success: true,
        authenticated: true,
        user_id: ctx.user_id,
        role: ctx.role,
    })
}

/// `GET /api/admin/me`
pub async fn me_handler(
    Extension(ctx): Extension<AdminContext>,
) -> Json<ApiResponse<AdminContext>> {
    ok(ctx)
}
