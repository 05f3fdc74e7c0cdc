//! User store: credential checks and principal lifecycle on top of a
//! [`UserRepository`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::password::{BCRYPT_COST, hash_password_async, verify_password_async};
use super::repository::{UserPatch, UserRepository};
use super::{AuthError, CredentialError};
use crate::models::auth::{
    AdminUser, CapabilitySet, NewUser, Permissions, Profile, Role, UserStatus, UserUpdate,
};
use crate::uuid::new_user_id;

/// Principal lookups, credential validation and CRUD.
#[derive(Clone)]
pub struct UserStore {
    repo: Arc<dyn UserRepository>,
    hash_cost: u32,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}

/// Return the trimmed value of a required field or name it in the error.
fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AuthError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::ValidationError(format!(
            "Missing required field: {field}"
        ))),
    }
}

impl UserStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            hash_cost: BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError> {
        self.repo.find_by_username(username).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<AdminUser>, AuthError> {
        self.repo.find_by_id(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<AdminUser>, AuthError> {
        self.repo.list().await
    }

    /// Check a username/password pair.
    ///
    /// The password is verified before the status so a non-active account is
    /// only revealed to a caller who knows its password.
    pub async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminUser, CredentialError> {
        let user = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or(CredentialError::NoUser)?;

        let matches =
            verify_password_async(password.to_string(), user.password_hash.clone()).await?;
        if !matches {
            return Err(CredentialError::IncorrectPassword);
        }

        if !user.status.is_active() {
            return Err(CredentialError::Status(user.status));
        }
        Ok(user)
    }

    /// Create a principal from request data.
    pub async fn create_user(&self, data: NewUser) -> Result<AdminUser, AuthError> {
        let username = required(&data.username, "username")?.to_string();
        // Hashed as given; only a blank password is refused.
        let password = match data.password {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(AuthError::ValidationError(
                    "Missing required field: password".into(),
                ));
            }
        };
        let first_name = required(&data.first_name, "firstName")?.to_string();
        let last_name = required(&data.last_name, "lastName")?.to_string();
        let email = required(&data.email, "email")?.to_string();
        let role: Role = required(&data.role, "role")?
            .parse()
            .map_err(|e| AuthError::ValidationError(format!("{e}")))?;

        if !email.contains('@') {
            return Err(AuthError::ValidationError(format!("Invalid email: {email}")));
        }

        // Cheap early exit; the repository re-checks atomically on insert.
        if self.repo.find_by_username(&username).await?.is_some() {
            return Err(AuthError::Conflict(format!(
                "Username '{username}' already exists"
            )));
        }

        let password_hash = hash_password_async(password, self.hash_cost).await?;
        let now = Utc::now();
        let user = AdminUser {
            id: new_user_id(),
            username,
            email,
            first_name,
            last_name,
            password_hash,
            role,
            permissions: data.permissions.unwrap_or_else(Permissions::minimal),
            status: data.status.unwrap_or(UserStatus::Active),
            profile: data.profile.unwrap_or_default(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.repo.insert(user).await?;
        info!(
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "created admin user"
        );
        Ok(user)
    }

    /// Apply a partial update. `Ok(None)` when no principal has `id`.
    pub async fn update_user(
        &self,
        id: &str,
        partial: UserUpdate,
    ) -> Result<Option<AdminUser>, AuthError> {
        let username = match partial.username {
            Some(username) => {
                let username = username.trim().to_string();
                if username.is_empty() {
                    return Err(AuthError::ValidationError("username must not be empty".into()));
                }
                Some(username)
            }
            None => None,
        };
        let password_hash = match partial.password {
            Some(password) if password.is_empty() => {
                return Err(AuthError::ValidationError("password must not be empty".into()));
            }
            Some(password) => Some(hash_password_async(password, self.hash_cost).await?),
            None => None,
        };
        let patch = UserPatch {
            username,
            password_hash,
            first_name: partial.first_name,
            last_name: partial.last_name,
            email: partial.email,
            role: partial.role,
            status: partial.status,
            permissions: partial.permissions,
            profile: partial.profile,
        };

        let updated = self.repo.update(id, patch, Utc::now()).await?;
        if let Some(ref u) = updated {
            debug!(user_id = %u.id, "updated admin user");
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool, AuthError> {
        let deleted = self.repo.delete(id).await?;
        if deleted {
            info!(user_id = %id, "deleted admin user");
        }
        Ok(deleted)
    }

    /// Stamp `lastLogin` after a successful login. Returns the stamped record.
    pub async fn record_login(&self, id: &str) -> Result<Option<AdminUser>, AuthError> {
        self.repo.record_login(id, Utc::now()).await
    }

    /// Create an active SUPER_ADMIN named `username` unless one already
    /// exists. Returns the created principal, or `None` if it was present.
    pub async fn seed_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, AuthError> {
        if self.repo.find_by_username(username).await?.is_some() {
            debug!(username, "seed admin already present");
            return Ok(None);
        }
        let mut permissions = Permissions::minimal();
        for resource in ["users", "content"] {
            permissions.set(resource, CapabilitySet::all());
        }
        let data = NewUser {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            first_name: Some("Super".into()),
            last_name: Some("Admin".into()),
            email: Some(format!("{username}@localhost")),
            role: Some(Role::SuperAdmin.as_str().to_string()),
            status: Some(UserStatus::Active),
            permissions: Some(permissions),
            profile: Some(Profile::default()),
        };
        match self.create_user(data).await {
            Ok(user) => Ok(Some(user)),
            // Lost a race with another seeder; the admin exists either way.
            Err(AuthError::Conflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
