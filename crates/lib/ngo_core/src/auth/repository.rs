//! User repository abstraction and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::AuthError;
use crate::models::auth::{AdminUser, Permissions, Profile, Role, UserStatus};

/// Field-level changes to a principal. `None` leaves the stored value alone.
///
/// The password arrives already hashed; validation happens in the store.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub permissions: Option<Permissions>,
    pub profile: Option<Profile>,
}

impl UserPatch {
    fn apply(self, user: &mut AdminUser) {
        if let Some(v) = self.username {
            user.username = v;
        }
        if let Some(v) = self.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = self.first_name {
            user.first_name = v;
        }
        if let Some(v) = self.last_name {
            user.last_name = v;
        }
        if let Some(v) = self.email {
            user.email = v;
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = self.status {
            user.status = v;
        }
        if let Some(v) = self.permissions {
            user.permissions = v;
        }
        if let Some(v) = self.profile {
            user.profile = v;
        }
    }
}

/// Persistence for admin principals.
///
/// Implementations must enforce username uniqueness atomically in `insert`
/// and `update`: a concurrent duplicate returns `AuthError::Conflict`.
/// Writes touch only the fields they name, so overlapping writers never
/// restore each other's stale values.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminUser>, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError>;

    async fn list(&self) -> Result<Vec<AdminUser>, AuthError>;

    async fn insert(&self, user: AdminUser) -> Result<AdminUser, AuthError>;

    /// Apply `patch` and stamp `updated_at`. `None` if no record has `id`.
    async fn update(
        &self,
        id: &str,
        patch: UserPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError>;

    /// Set `last_login` and `updated_at` only.
    async fn record_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError>;

    async fn delete(&self, id: &str) -> Result<bool, AuthError>;
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, AdminUser>,
    /// username → id
    by_username: HashMap<String, String>,
}

/// Process-local repository. Every mutation runs under one write lock, so the
/// uniqueness check and the insert are a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<Tables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn username_taken(username: &str) -> AuthError {
    AuthError::Conflict(format!("Username '{username}' already exists"))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminUser>, AuthError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError> {
        let t = self.tables.read().await;
        Ok(t.by_username
            .get(username)
            .and_then(|id| t.users.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<AdminUser>, AuthError> {
        let t = self.tables.read().await;
        let mut users: Vec<AdminUser> = t.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.username.cmp(&b.username)));
        Ok(users)
    }

    async fn insert(&self, user: AdminUser) -> Result<AdminUser, AuthError> {
        let mut t = self.tables.write().await;
        if t.by_username.contains_key(&user.username) {
            return Err(username_taken(&user.username));
        }
        if t.users.contains_key(&user.id) {
            return Err(AuthError::Conflict(format!("User id '{}' already exists", user.id)));
        }
        t.by_username.insert(user.username.clone(), user.id.clone());
        t.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        id: &str,
        patch: UserPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError> {
        let mut t = self.tables.write().await;
        let Some(previous_username) = t.users.get(id).map(|u| u.username.clone()) else {
            return Ok(None);
        };
        if let Some(username) = patch.username.as_deref()
            && username != previous_username
        {
            if t.by_username.contains_key(username) {
                return Err(username_taken(username));
            }
            t.by_username.remove(&previous_username);
            t.by_username.insert(username.to_string(), id.to_string());
        }
        let Some(user) = t.users.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(user);
        user.updated_at = at;
        Ok(Some(user.clone()))
    }

    async fn record_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AuthError> {
        let mut t = self.tables.write().await;
        Ok(t.users.get_mut(id).map(|user| {
            user.last_login = Some(at);
            user.updated_at = at;
            user.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, AuthError> {
        let mut t = self.tables.write().await;
        match t.users.remove(id) {
            Some(user) => {
                t.by_username.remove(&user.username);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
