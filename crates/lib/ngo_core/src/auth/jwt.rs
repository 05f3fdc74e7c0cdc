//! JWT token generation and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenSubject};

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Signs and verifies HS256 session tokens.
///
/// Built once at startup; an empty secret is rejected here so a missing
/// secret fails the process instead of individual requests.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::ConfigurationError(
                "JWT signing secret is not set".into(),
            ));
        }
        if ttl_secs <= 0 {
            return Err(AuthError::ConfigurationError(format!(
                "token TTL must be positive, got {ttl_secs}"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign a token for `subject`, issued now.
    pub fn sign(&self, subject: &TokenSubject) -> Result<String, AuthError> {
        self.sign_at(subject, Utc::now().timestamp())
    }

    /// Sign a token as if issued at unix time `now`.
    pub fn sign_at(&self, subject: &TokenSubject, now: i64) -> Result<String, AuthError> {
        if subject.user_id.is_empty() || subject.username.is_empty() {
            return Err(AuthError::ValidationError(
                "token subject requires userId and username".into(),
            ));
        }
        let claims = TokenClaims {
            user_id: subject.user_id.clone(),
            username: subject.username.clone(),
            role: subject.role,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify a token against the current time.
    ///
    /// Every failure (malformed, bad signature, expired, wrong shape) yields
    /// `None`; callers must not tell them apart.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as of unix time `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against `now` with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .ok()?
            .claims;

        if claims.user_id.is_empty() || claims.username.is_empty() {
            return None;
        }
        if claims.exp != claims.iat + self.ttl.num_seconds() || now >= claims.exp {
            return None;
        }
        Some(claims)
    }
}

/// Generate a random 64-character secret suitable for `JWT_SECRET`.
pub fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
