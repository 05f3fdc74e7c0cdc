//! Cookie service: build and clear the admin auth cookies.
//!
//! All cookies are http-only, `SameSite=Strict`, path `/`, and `Secure`
//! when the server runs in production.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::middleware::auth::AdminContext;

/// Signed session token.
pub const JWT_COOKIE: &str = "jwt";
pub const USER_ID_COOKIE: &str = "x-user-id";
pub const USER_ROLE_COOKIE: &str = "x-user-role";
pub const USER_NAME_COOKIE: &str = "x-user-name";
/// Per-browser correlation id used to key the session pool.
pub const SESSION_COOKIE: &str = "session_id";

const IDENTITY_COOKIES: [&str; 3] = [USER_ID_COOKIE, USER_ROLE_COOKIE, USER_NAME_COOKIE];

/// Identity cookies live for a day.
const IDENTITY_MAX_AGE: Duration = Duration::hours(24);
const SESSION_MAX_AGE: Duration = Duration::days(30);

fn build(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

/// The `jwt` cookie, expiring with the token.
pub fn token_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    build(
        JWT_COOKIE,
        token.to_string(),
        Duration::seconds(max_age_secs),
        secure,
    )
}

pub fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    build(SESSION_COOKIE, session_id.to_string(), SESSION_MAX_AGE, secure)
}

/// Add (or refresh) `x-user-id`, `x-user-role` and `x-user-name`.
pub fn with_identity(
    jar: CookieJar,
    user_id: &str,
    role: &str,
    username: &str,
    secure: bool,
) -> CookieJar {
    jar.add(build(USER_ID_COOKIE, user_id.to_string(), IDENTITY_MAX_AGE, secure))
        .add(build(USER_ROLE_COOKIE, role.to_string(), IDENTITY_MAX_AGE, secure))
        .add(build(USER_NAME_COOKIE, username.to_string(), IDENTITY_MAX_AGE, secure))
}

pub fn with_context(jar: CookieJar, ctx: &AdminContext, secure: bool) -> CookieJar {
    with_identity(jar, &ctx.user_id, ctx.role.as_str(), &ctx.username, secure)
}

fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    build(name, String::new(), Duration::ZERO, secure)
}

/// Expire the identity cookies, leaving `jwt` alone.
pub fn clear_identity(jar: CookieJar, secure: bool) -> CookieJar {
    IDENTITY_COOKIES
        .into_iter()
        .fold(jar, |jar, name| jar.add(expired(name, secure)))
}

/// Expire `jwt` and the identity cookies.
pub fn clear_auth(jar: CookieJar, secure: bool) -> CookieJar {
    clear_identity(jar, secure).add(expired(JWT_COOKIE, secure))
}

/// Current `jwt` cookie value, if non-empty.
pub fn token_from(jar: &CookieJar) -> Option<&str> {
    jar.get(JWT_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}
