//! Credential Verifier.
//!
//! Resolves which channel a login targets and checks a supplied password
//! against the stored hash. "No such user", "no password set" and "wrong
//! password" all come back as [`AuthError::InvalidCredentials`].

use crate::channel::{LoginTarget, resolve_identifier};
use crate::error::{AuthError, Result};
use crate::providers::{PasswordHasher, UserRepository};
use crate::state::User;

/// Credential Verifier.
#[derive(Clone, Debug)]
pub struct CredentialVerifier<U, H> {
    users: U,
    hasher: H,
    min_password_length: usize,
}

impl<U, H> CredentialVerifier<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    /// Create a verifier.
    #[must_use]
    pub const fn new(users: U, hasher: H, min_password_length: usize) -> Self {
        Self {
            users,
            hasher,
            min_password_length,
        }
    }

    /// Classify a login identifier. See [`resolve_identifier`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for malformed input.
    pub fn resolve_channel(
        &self,
        identifier: &str,
        country_code: Option<&str>,
    ) -> Result<LoginTarget> {
        resolve_identifier(identifier, country_code)
    }

    /// Compare a supplied password with a stored hash.
    ///
    /// # Errors
    ///
    /// Returns error if the hasher fails (e.g. the stored hash is corrupt).
    pub async fn check_password(&self, stored_hash: &str, supplied: &str) -> Result<bool> {
        self.hasher.verify(supplied, stored_hash).await
    }

    /// Hash a new password after checking its length.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the password is too short, or the
    /// hasher's error.
    pub async fn hash_password(&self, plaintext: &str) -> Result<String> {
        self.validate_password(plaintext)?;
        self.hasher.hash(plaintext).await
    }

    /// Check a new password's length without hashing it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the password is too short.
    pub fn validate_password(&self, plaintext: &str) -> Result<()> {
        if plaintext.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "password - must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    /// Find the user owning `target` and check `password`.
    ///
    /// Re-reads the user on every call.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] if no user owns the channel, the
    ///   user has no password, or the password does not match
    /// - Repository or hasher errors otherwise
    pub async fn authenticate(&self, target: &LoginTarget, password: &str) -> Result<User> {
        let Some(user) = self.users.find_by_channel(target).await? else {
            // Same hashing cost as the mismatch path.
            let _ = self.hasher.hash(password).await?;
            tracing::warn!(channel = target.kind().as_str(), "Login rejected: unknown channel");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(stored_hash) = user.password_hash.as_deref() else {
            tracing::warn!(user_id = %user.user_id, "Login rejected: no password set");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.check_password(stored_hash, password).await? {
            tracing::warn!(user_id = %user.user_id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
