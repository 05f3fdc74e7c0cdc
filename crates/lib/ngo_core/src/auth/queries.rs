//! PostgreSQL-backed user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use super::AuthError;
use super::repository::{UserPatch, UserRepository};
use crate::models::auth::{AdminUser, Permissions, Profile};

const USER_COLUMNS: &str = "id::text, username, email, first_name, last_name, password_hash, \
     role, permissions, status, profile, last_login, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    permissions: Json<Permissions>,
    status: String,
    profile: Json<Profile>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for AdminUser {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(AdminUser {
            role: row
                .role
                .parse()
                .map_err(|e| AuthError::Internal(format!("user {}: {e}", row.id)))?,
            status: row
                .status
                .parse()
                .map_err(|e| AuthError::Internal(format!("user {}: {e}", row.id)))?,
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            permissions: row.permissions.0,
            profile: row.profile.0,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique-index violation on `username` to `Conflict`.
fn map_write_error(e: sqlx::Error, username: &str) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(format!("Username '{username}' already exists"))
        }
        _ => AuthError::DbError(e),
    }
}

/// User repository over the `admin_users` table. Uniqueness is enforced by
/// the `admin_users_username_key` index.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminUser>, AuthError> {
        // Non-UUID ids cannot exist; avoid a cast error from Postgres.
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users WHERE id = $1::uuid"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<AdminUser>, AuthError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users ORDER BY created_at, username"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AdminUser::try_from).collect()
    }

    async fn insert(&self, user: AdminUser) -> Result<AdminUser, AuthError> {
        sqlx::query(
            "INSERT INTO admin_users \
             (id, username, email, first_name, last_name, password_hash, role, permissions, \
              status, profile, last_login, created_at, updated_at) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(Json(&user.permissions))
        .bind(user.status.as_str())
        .bind(Json(&user.profile))
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &user.username))?;
        Ok(user)
    }

    async fn update(
        &self,
        id: &str,
        patch: UserPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let username = patch.username.clone().unwrap_or_default();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE admin_users SET \
             username = COALESCE($2, username), \
             password_hash = COALESCE($3, password_hash), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), \
             email = COALESCE($6, email), \
             role = COALESCE($7, role), \
             status = COALESCE($8, status), \
             permissions = COALESCE($9, permissions), \
             profile = COALESCE($10, profile), \
             updated_at = $11 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.username)
        .bind(patch.password_hash)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.email)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.permissions.map(Json))
        .bind(patch.profile.map(Json))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &username))?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn record_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE admin_users SET last_login = $2, updated_at = $2 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(false);
        }
        let result = sqlx::query("DELETE FROM admin_users WHERE id = $1::uuid")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
