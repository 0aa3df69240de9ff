//! Password hashing.
//!
//! The core never stores or compares plaintext. Verification parses the
//! stored PHC string and runs the library's verifier against it; it never
//! re-hashes the supplied password and compares hash strings.

use crate::error::{AuthError, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _};
use rand::rngs::OsRng;

/// Password hasher.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails.
    fn hash(&self, plaintext: &str) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Compare a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns error if the stored hash cannot be parsed or hashing fails.
    /// A mismatch is `Ok(false)`, not an error.
    fn verify(
        &self,
        plaintext: &str,
        hash: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Argon2id password hasher.
///
/// Both operations run on the blocking thread pool.
#[derive(Clone, Debug, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    /// Create a hasher with the default Argon2id parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<String> {
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {e}")))
        })
        .await
        .map_err(|e| AuthError::InternalError(format!("Hashing task failed: {e}")))?
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| AuthError::InternalError(format!("Stored hash is malformed: {e}")))?;

            match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::InternalError(format!(
                    "Password verification failed: {e}"
                ))),
            }
        })
        .await
        .map_err(|e| AuthError::InternalError(format!("Hashing task failed: {e}")))?
    }
}
