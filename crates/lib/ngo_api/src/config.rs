//! API server configuration.

use std::time::Duration;

use ngo_core::auth::jwt::DEFAULT_TOKEN_TTL_SECS;
use ngo_core::content::connector::DEFAULT_MAX_CONNECTIONS;
use ngo_core::pool::DEFAULT_IDLE_TIMEOUT;
use thiserror::Error;

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Credentials for the SUPER_ADMIN created at startup.
#[derive(Clone, Debug)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// Inactivity window before a session's store handle is closed.
    pub session_idle_timeout: Duration,
    /// Connection cap of the content pool shared by all sessions.
    pub session_max_connections: u32,
    /// Mark cookies `Secure`.
    pub secure_cookies: bool,
    pub seed_admin: Option<SeedAdmin>,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                    | Default                              |
    /// |-----------------------------|--------------------------------------|
    /// | `BIND_ADDR`                 | `127.0.0.1:3000`                     |
    /// | `DATABASE_URL`              | `postgres://localhost:5432/ngo`      |
    /// | `JWT_SECRET`                | required                             |
    /// | `TOKEN_TTL_SECS`            | `86400`                              |
    /// | `SESSION_IDLE_TIMEOUT_SECS` | `30`                                 |
    /// | `SESSION_MAX_CONNECTIONS`   | `5`                                  |
    /// | `APP_ENV`                   | `development` (`production` → secure cookies) |
    /// | `SEED_ADMIN_USERNAME` / `SEED_ADMIN_PASSWORD` | unset (no seeding) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let token_ttl_secs = parse_or(&var, "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                value: token_ttl_secs.to_string(),
            });
        }
        let idle_secs = parse_or(
            &var,
            "SESSION_IDLE_TIMEOUT_SECS",
            DEFAULT_IDLE_TIMEOUT.as_secs(),
        )?;
        let session_max_connections =
            parse_or(&var, "SESSION_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        let seed_admin = match (var("SEED_ADMIN_USERNAME"), var("SEED_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(SeedAdmin { username, password }),
            (Some(_), None) => return Err(ConfigError::Missing("SEED_ADMIN_PASSWORD")),
            _ => None,
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/ngo".into()),
            jwt_secret,
            token_ttl_secs,
            session_idle_timeout: Duration::from_secs(idle_secs),
            session_max_connections,
            secure_cookies: var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
            seed_admin,
        })
    }
}

fn parse_or<T, V>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
