//! Admin user management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use ngo_core::models::auth::{AdminUser, NewUser, Role, UserUpdate};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::{ApiResponse, ok, ok_with};
use crate::middleware::auth::AdminContext;
use crate::services::auth::require_token_role;

type UserResponse = Json<ApiResponse<AdminUser>>;

/// `GET /api/admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<AdminUser>>>> {
    Ok(ok(state.users.list_users().await?))
}

/// `POST /api/admin/users`: SUPER_ADMIN only, judged by the token's role.
pub async fn create_user_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<NewUser>,
) -> AppResult<(StatusCode, UserResponse)> {
    let claims = require_token_role(&state, &jar, Role::SuperAdmin)?;
    let user = state.users.create_user(body).await?;
    info!(created_by = %claims.user_id, user_id = %user.id, "admin user created");
    Ok((
        StatusCode::CREATED,
        ok_with(user, "User created successfully"),
    ))
}

/// `PUT /api/admin/users/{id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> AppResult<UserResponse> {
    let user = state
        .users
        .update_user(&id, body)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(ok_with(user, "User updated successfully"))
}

/// `DELETE /api/admin/users/{id}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    if ctx.user_id == id {
        return Err(AppError::Validation(
            "You cannot delete your own account".into(),
        ));
    }
    if !state.users.delete_user(&id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(ok_with((), "User deleted successfully"))
}
