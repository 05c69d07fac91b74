//! Password hashing
//!
//! The rest of the system only ever sees this capability trait; the
//! concrete algorithm stays swappable.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult};

/// Hashing and verification of user passwords.
pub trait PasswordVerifier: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash(&self, plaintext: &str) -> AppResult<String>;

    /// Check a plaintext password against a stored hash.
    fn matches(&self, hash: &str, plaintext: &str) -> bool;
}

/// Argon2id-backed [`PasswordVerifier`].
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordVerifier;

impl Argon2PasswordVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordVerifier for Argon2PasswordVerifier {
    fn hash(&self, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn matches(&self, hash: &str, plaintext: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(plaintext.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
