//! # ngo_api
//!
//! HTTP API library for the NGO site: admin auth gate, user management,
//! content CRUD and public content mirrors.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use ngo_core::auth::jwt::TokenCodec;
use ngo_core::auth::store::UserStore;
use ngo_core::content::connector::ContentConnector;
use ngo_core::pool::SessionPool;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, content, health, pages, public, users};
use crate::middleware::auth::{require_admin, require_super_admin};
use crate::middleware::edge::require_token;
use crate::middleware::session::ensure_session;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Admin principals.
    pub users: UserStore,
    /// Session token signer/verifier.
    pub tokens: TokenCodec,
    /// Per-browser content store handles.
    pub sessions: SessionPool<ContentConnector>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
///
/// Delegates to `ngo_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    ngo_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/health", get(health::health_handler))
        .route("/api/admin/login", post(auth::login_handler))
        .route("/api/admin/logout", post(auth::logout_handler))
        .route("/api/{resource}", get(public::list_handler))
        .route("/api/{resource}/{id}", get(public::get_handler))
        .route("/admin/login", get(pages::login_page));

    // Listing goes through the gate; creating checks the token's role itself.
    let user_collection = get(users::list_users_handler)
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .post(users::create_user_handler);

    // Protected admin API
    let admin = Router::new()
        .route("/api/admin/auth/check", get(auth::auth_check_handler))
        .route("/api/admin/me", get(auth::me_handler))
        .route(
            "/api/admin/users/{id}",
            put(users::update_user_handler)
                .delete(users::delete_user_handler)
                .route_layer(from_fn(require_super_admin)),
        )
        .route(
            "/api/admin/{resource}",
            get(content::get_handler)
                .post(content::create_handler)
                .put(content::update_handler)
                .delete(content::delete_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    // Admin pages behind the token-only edge gate
    let pages = Router::new()
        .route("/admin", get(pages::dashboard_page))
        .route("/admin/{*path}", get(pages::dashboard_page))
        .route_layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .merge(public)
        .route("/api/admin/users", user_collection)
        .merge(admin)
        .merge(pages)
        .layer(from_fn_with_state(state.clone(), ensure_session))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
