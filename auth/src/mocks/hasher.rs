//! Mock password hasher for testing.

use crate::error::Result;
use crate::providers::PasswordHasher;

const PREFIX: &str = "mock$";

/// Mock password hasher.
///
/// Produces `mock$<plaintext>` so tests run without Argon2's cost. Never use
/// outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPasswordHasher;

impl MockPasswordHasher {
    /// Create a new mock hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PasswordHasher for MockPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<String> {
        Ok(format!("{PREFIX}{plaintext}"))
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        let Some(stored) = hash.strip_prefix(PREFIX) else {
            return Ok(false);
        };
        Ok(constant_time_eq::constant_time_eq(
            stored.as_bytes(),
            plaintext.as_bytes(),
        ))
    }
}
