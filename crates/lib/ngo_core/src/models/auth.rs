//! Authentication domain models.
//!
//! Roles and statuses are closed enums so an arbitrary string can never end up
//! as a principal's role. Permissions map a resource name to a capability set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a role or status from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseModelError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

/// Authorization level of an admin principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(ParseModelError::UnknownRole(other.to_string())),
        }
    }
}

/// Lifecycle status. Only `Active` principals may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
            UserStatus::Pending => "pending",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            "pending" => Ok(UserStatus::Pending),
            other => Err(ParseModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// A single operation a principal may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Update,
    Delete,
}

/// Set of capabilities granted on one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self::from_iter([Capability::Read])
    }

    pub fn all() -> Self {
        Self::from_iter([
            Capability::Read,
            Capability::Write,
            Capability::Update,
            Capability::Delete,
        ])
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.0.remove(&capability);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resource name → capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, CapabilitySet>);

impl Permissions {
    /// Permission set given to new principals unless overridden:
    /// read-only access to `users`.
    pub fn minimal() -> Self {
        let mut p = Self::default();
        p.set("users", CapabilitySet::read_only());
        p
    }

    pub fn set(&mut self, resource: &str, capabilities: CapabilitySet) {
        self.0.insert(resource.to_string(), capabilities);
    }

    pub fn get(&self, resource: &str) -> Option<&CapabilitySet> {
        self.0.get(resource)
    }

    pub fn allows(&self, resource: &str, capability: Capability) -> bool {
        self.0
            .get(resource)
            .is_some_and(|caps| caps.allows(capability))
    }
}

/// UI and notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: String,
    pub two_factor_enabled: bool,
    pub email_frequency: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            two_factor_enabled: false,
            email_frequency: "daily".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Free-form profile data attached to a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub preferences: Preferences,
    pub contact: ContactDetails,
}

/// Admin principal.
///
/// `password_hash` is never serialized, so the struct can be returned from
/// handlers directly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub permissions: Permissions,
    pub status: UserStatus,
    pub profile: Profile,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a principal. Required fields are optional here so the
/// store can report exactly which one is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<UserStatus>,
    pub permissions: Option<Permissions>,
    pub profile: Option<Profile>,
}

/// Partial update of a principal. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub permissions: Option<Permissions>,
    pub profile: Option<Profile>,
}

/// Identity carried inside a signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl From<&AdminUser> for TokenSubject {
    fn from(user: &AdminUser) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// JWT claims. Unknown fields are rejected so only tokens of exactly this
/// shape verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenClaims {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("root".parse::<Role>().is_err());
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn status_roundtrips_through_text() {
        for s in [
            UserStatus::Active,
            UserStatus::Inactive,
            UserStatus::Suspended,
            UserStatus::Pending,
        ] {
            assert_eq!(s.as_str().parse::<UserStatus>().unwrap(), s);
        }
        assert!(UserStatus::Active.is_active());
        assert!(!UserStatus::Pending.is_active());
    }

    #[test]
    fn minimal_permissions_only_read_users() {
        let p = Permissions::minimal();
        assert!(p.allows("users", Capability::Read));
        assert!(!p.allows("users", Capability::Write));
        assert!(!p.allows("events", Capability::Read));
    }

    #[test]
    fn permissions_serialize_as_named_sets() {
        let mut p = Permissions::default();
        p.set("events", CapabilitySet::from_iter([Capability::Read, Capability::Delete]));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json, serde_json::json!({"events": ["read", "delete"]}));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = AdminUser {
            id: "u1".into(),
            username: "admin".into(),
            email: "admin@example.org".into(),
            first_name: "Site".into(),
            last_name: "Admin".into(),
            password_hash: "$2b$secret".into(),
            role: Role::Admin,
            permissions: Permissions::minimal(),
            status: UserStatus::Active,
            profile: Profile::default(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["firstName"], "Site");
    }
}
