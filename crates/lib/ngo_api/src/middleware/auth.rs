//! Admin auth gate.
//!
//! Verifies the `jwt` cookie, resolves the principal, and requires ACTIVE
//! status before the request reaches a handler. The principal is attached
//! as an [`AdminContext`] extension and as `x-user-*` headers; identity
//! cookies are refreshed on the way out.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use ngo_core::models::auth::{AdminUser, Permissions, Profile, Role, UserStatus};
use serde::Serialize;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::services::cookies;

/// Downstream identity headers.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_NAME_HEADER: &str = "x-user-name";

const IDENTITY_HEADERS: [&str; 3] = [USER_ID_HEADER, USER_ROLE_HEADER, USER_NAME_HEADER];

/// Drop client-supplied identity headers; only the gate may set them.
pub(crate) fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

/// Authenticated principal for the current request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminContext {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub permissions: Permissions,
    pub profile: Profile,
    pub status: UserStatus,
}

impl From<&AdminUser> for AdminContext {
    fn from(user: &AdminUser) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
            profile: user.profile.clone(),
            status: user.status,
        }
    }
}

/// Require one of `allowed` roles.
pub fn ensure_role(ctx: &AdminContext, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&ctx.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Forbidden".into()))
    }
}

/// Axum middleware guarding `/api/admin/*`.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let secure = state.config.secure_cookies;
    strip_identity_headers(request.headers_mut());

    let Some(token) = cookies::token_from(&jar).map(str::to_owned) else {
        return reject(
            cookies::clear_identity(jar, secure),
            AppError::Unauthorized("Unauthorized - No token provided".into()),
        );
    };

    let Some(claims) = state.tokens.verify(&token) else {
        debug!("rejected invalid or expired token");
        return reject(
            cookies::clear_auth(jar, secure),
            AppError::Unauthorized("Unauthorized - Invalid token".into()),
        );
    };

    let user = match state.users.find_by_id(&claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(user_id = %claims.user_id, "token for unknown user");
            return reject(
                cookies::clear_auth(jar, secure),
                AppError::Unauthorized("Unauthorized - User not found".into()),
            );
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    if !user.status.is_active() {
        warn!(user_id = %user.id, status = %user.status, "blocked non-active user");
        return reject(
            cookies::clear_auth(jar, secure),
            AppError::Forbidden(format!("Account is {}", user.status)),
        );
    }

    let ctx = AdminContext::from(&user);
    let headers = request.headers_mut();
    for (name, value) in [
        (USER_ID_HEADER, ctx.user_id.as_str()),
        (USER_ROLE_HEADER, ctx.role.as_str()),
        (USER_NAME_HEADER, ctx.username.as_str()),
    ] {
        if let Ok(v) = HeaderValue::from_str(value) {
            headers.insert(name, v);
        }
    }
    let jar = cookies::with_context(jar, &ctx, secure);
    request.extensions_mut().insert(ctx);

    let response = next.run(request).await;
    (jar, response).into_response()
}

/// Narrower policy on top of [`require_admin`]: SUPER_ADMIN only.
pub async fn require_super_admin(request: Request, next: Next) -> AppResult<Response> {
    let ctx = request
        .extensions()
        .get::<AdminContext>()
        .ok_or_else(|| AppError::Unauthorized("Unauthorized - No token provided".into()))?;
    ensure_role(ctx, &[Role::SuperAdmin])?;
    Ok(next.run(request).await)
}

fn reject(jar: CookieJar, err: AppError) -> Response {
    (jar, err).into_response()
}
