//! Password hashing via bcrypt.
//!
//! bcrypt salts every hash and its verify is a constant-time comparison.
//! The async variants move the work onto the blocking pool.

use super::AuthError;

/// bcrypt cost factor used in production.
pub const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

pub async fn hash_password_async(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("hash task: {e}")))?
}

pub async fn verify_password_async(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_verifies_and_is_salted() {
        let a = hash_password("admin123", TEST_COST).unwrap();
        let b = hash_password("admin123", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("admin123", &a).unwrap());
        assert!(!verify_password("admin124", &a).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("admin123", "plaintext").is_err());
    }

    #[tokio::test]
    async fn async_variants_agree() {
        let h = hash_password_async("s3cret".into(), TEST_COST).await.unwrap();
        assert!(verify_password_async("s3cret".into(), h.clone()).await.unwrap());
        assert!(!verify_password_async("wrong".into(), h).await.unwrap());
    }
}
