//! Authentication and authorization logic.
//!
//! Token signing, password hashing, and the user store with its pluggable
//! repositories. Shared by `ngo_api` and `ngo_cli`.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod repository;
pub mod store;

use thiserror::Error;

use crate::models::auth::UserStatus;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outcome of a failed credential check.
///
/// Returned rather than collapsed into one error so the login endpoint can
/// choose the status code.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("User not found")]
    NoUser,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Account is {0}")]
    Status(UserStatus),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
