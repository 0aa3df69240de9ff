//! Mock token store for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::{TokenData, TokenStore};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock token store.
///
/// In-memory token store with the same single-use semantics as the Redis
/// store: check-and-delete happens under one lock, and a mismatched token
/// leaves the live one in place.
#[derive(Debug, Clone, Default)]
pub struct MockTokenStore {
    tokens: Arc<Mutex<HashMap<String, TokenData>>>,
    writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MockTokenStore {
    /// Create a new mock token store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live token value for a channel (what a user would read from their inbox).
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn token_for(&self, channel_id: &str) -> Result<Option<String>> {
        Ok(lock(&self.tokens)?
            .get(channel_id)
            .filter(|data| !data.is_expired())
            .map(|data| data.token.clone()))
    }

    /// Move a token's expiry into the past, as if its TTL had elapsed.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn expire(&self, channel_id: &str) -> Result<()> {
        if let Some(data) = lock(&self.tokens)?.get_mut(channel_id) {
            data.expires_at = Utc::now() - Duration::seconds(1);
        }
        Ok(())
    }

    /// Number of successful `store_token` calls.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `CacheError`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::CacheError("token store unavailable".to_string()));
        }
        Ok(())
    }
}

impl TokenStore for MockTokenStore {
    async fn store_token(&self, channel_id: &str, token_data: TokenData) -> Result<()> {
        self.check_available()?;
        lock(&self.tokens)?.insert(channel_id.to_string(), token_data);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn consume_token(&self, channel_id: &str, token: &str) -> Result<Option<TokenData>> {
        self.check_available()?;
        let mut tokens = lock(&self.tokens)?;

        let Some(stored) = tokens.get(channel_id) else {
            return Ok(None);
        };

        if stored.is_expired() {
            tokens.remove(channel_id);
            return Ok(None);
        }

        if !constant_time_eq::constant_time_eq(token.as_bytes(), stored.token.as_bytes()) {
            return Ok(None);
        }

        Ok(tokens.remove(channel_id))
    }

    async fn delete_token(&self, channel_id: &str) -> Result<()> {
        self.check_available()?;
        lock(&self.tokens)?.remove(channel_id);
        Ok(())
    }

    async fn exists(&self, channel_id: &str) -> Result<bool> {
        self.check_available()?;
        Ok(lock(&self.tokens)?
            .get(channel_id)
            .is_some_and(|data| !data.is_expired()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::providers::TokenPurpose;

    fn data(token: &str) -> TokenData {
        TokenData::new(
            TokenPurpose::EmailVerification,
            token.to_string(),
            Channel::Email("a@x.com".into()),
            Utc::now() + Duration::minutes(15),
        )
    }

    #[tokio::test]
    async fn test_mismatch_keeps_token() {
        let store = MockTokenStore::new();
        store.store_token("a@x.com", data("right")).await.unwrap();

        assert!(store.consume_token("a@x.com", "wrong").await.unwrap().is_none());
        assert!(store.exists("a@x.com").await.unwrap());
        assert!(store.consume_token("a@x.com", "right").await.unwrap().is_some());
        assert!(!store.exists("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_is_absent() {
        let store = MockTokenStore::new();
        store.store_token("a@x.com", data("right")).await.unwrap();
        store.expire("a@x.com").unwrap();

        assert!(!store.exists("a@x.com").await.unwrap());
        assert_eq!(store.token_for("a@x.com").unwrap(), None);
        assert!(store.consume_token("a@x.com", "right").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MockTokenStore::new();
        store.set_unavailable(true);

        let err = store.store_token("a@x.com", data("t")).await.unwrap_err();
        assert!(matches!(err, AuthError::CacheError(_)));
        assert_eq!(store.writes(), 0);
    }
}
