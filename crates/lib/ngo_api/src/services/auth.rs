//! Authentication service: login flow and token-only role checks.

use axum_extra::extract::cookie::CookieJar;
use ngo_core::auth::CredentialError;
use ngo_core::models::auth::{AdminUser, Role, TokenClaims, TokenSubject};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::services::cookies;

/// Successful login: the principal and its freshly signed token.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: AdminUser,
    pub token: String,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing required field: {field}")))
}

/// Check credentials and sign a session token.
///
/// Unknown user → 400, wrong password → 401, non-active → 403 naming the
/// status.
pub async fn login(
    state: &AppState,
    username: &Option<String>,
    password: &Option<String>,
) -> AppResult<LoginOutcome> {
    let username = required(username, "username")?;
    let password = password
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("Missing required field: password".into()))?;

    let mut user = match state.users.validate_credentials(username, password).await {
        Ok(user) => user,
        Err(CredentialError::NoUser) => {
            info!(username, "login for unknown user");
            return Err(AppError::Validation("Invalid username or password".into()));
        }
        Err(CredentialError::IncorrectPassword) => {
            info!(username, "login with incorrect password");
            return Err(AppError::Unauthorized("Invalid username or password".into()));
        }
        Err(CredentialError::Status(status)) => {
            warn!(username, %status, "login for non-active user");
            return Err(AppError::Forbidden(format!("Account is {status}")));
        }
        Err(CredentialError::Auth(e)) => return Err(e.into()),
    };

    let token = state.tokens.sign(&TokenSubject::from(&user))?;
    match state.users.record_login(&user.id).await {
        Ok(Some(stamped)) => user = stamped,
        Ok(None) => {}
        Err(e) => warn!(user_id = %user.id, error = %e, "failed to record login"),
    }
    info!(user_id = %user.id, role = %user.role, "admin logged in");
    Ok(LoginOutcome { user, token })
}

/// Cookies set by a successful login.
pub fn login_cookies(state: &AppState, jar: CookieJar, outcome: &LoginOutcome) -> CookieJar {
    let secure = state.config.secure_cookies;
    let jar = jar.add(cookies::token_cookie(
        &outcome.token,
        state.tokens.ttl_secs(),
        secure,
    ));
    cookies::with_identity(
        jar,
        &outcome.user.id,
        outcome.user.role.as_str(),
        &outcome.user.username,
        secure,
    )
}

/// Decode the session token and require `role`, without a user lookup.
pub fn require_token_role(state: &AppState, jar: &CookieJar, role: Role) -> AppResult<TokenClaims> {
    let token = cookies::token_from(jar)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized - No token provided".into()))?;
    let claims = state
        .tokens
        .verify(token)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized - Invalid token".into()))?;
    if claims.role != role {
        return Err(AppError::Forbidden("Forbidden".into()));
    }
    Ok(claims)
}
