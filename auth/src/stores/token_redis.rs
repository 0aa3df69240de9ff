//! Redis-based verification token store.
//!
//! # Architecture
//!
//! Tokens are stored in Redis with:
//! - **Primary key**: `tokens:{channel_id}` → JSON-serialized `TokenData`
//! - **TTL**: from the token's `expires_at` (15 minutes by default)
//! - **Overwrite on issue**: `SET ... EX` replaces any live token for the channel
//! - **Conditional consumption**: a Lua script compares the presented token
//!   and deletes the key only on a match
//!
//! # Security
//!
//! - **Single-use**: the script runs atomically on the server, so of two
//!   concurrent redemptions of the same token exactly one sees the value
//! - **Wrong guesses don't burn the token**: a mismatch leaves the key alone
//! - **Constant-time validation**: the returned value is re-checked with
//!   `constant_time_eq` together with its expiry
//!
//! # Example
//!
//! ```no_run
//! use account_auth::channel::Channel;
//! use account_auth::stores::RedisTokenStore;
//! use account_auth::providers::{TokenData, TokenPurpose, TokenStore};
//! use chrono::{Duration, Utc};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisTokenStore::new("redis://127.0.0.1:6379").await?;
//!
//! let channel = Channel::email("user@example.com")?;
//! let token_data = TokenData::new(
//!     TokenPurpose::EmailVerification,
//!     "qwertyuiopasdfghjklzxcvbnmqwer".to_string(),
//!     channel.clone(),
//!     Utc::now() + Duration::minutes(15),
//! );
//! store.store_token(&channel.channel_id(), token_data).await?;
//!
//! if let Some(token) = store
//!     .consume_token(&channel.channel_id(), "qwertyuiopasdfghjklzxcvbnmqwer")
//!     .await?
//! {
//!     println!("Verified {}", token.channel);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::{TokenData, TokenStore};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

/// Compare-and-delete. Returns the stored value on a match, nil otherwise.
const CONSUME_SCRIPT: &str = r"
    local raw = redis.call('GET', KEYS[1])
    if not raw then
        return false
    end
    local data = cjson.decode(raw)
    if data['token'] ~= ARGV[1] then
        return false
    end
    redis.call('DEL', KEYS[1])
    return raw
";

/// `Redis`-based token store with conditional atomic consumption.
///
/// # Thread Safety
///
/// This type is `Clone` and can be safely shared across threads.
/// Each clone shares the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisTokenStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Loaded once; `invoke_async` falls back to `EVAL` on `NOSCRIPT`.
    consume_script: Script,
}

impl RedisTokenStore {
    /// Create a new `Redis` token store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `Redis` URL is malformed
    /// - Connection to `Redis` server fails
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::CacheError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!("RedisTokenStore initialized successfully");

        Ok(Self::from_manager(conn_manager))
    }

    /// Build a store over an existing connection manager.
    #[must_use]
    pub fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            consume_script: Script::new(CONSUME_SCRIPT),
        }
    }

    /// Get the `Redis` key for a channel's token.
    fn token_key(channel_id: &str) -> String {
        format!("tokens:{channel_id}")
    }
}

impl TokenStore for RedisTokenStore {
    async fn store_token(&self, channel_id: &str, token_data: TokenData) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(channel_id);

        let token_bytes = serde_json::to_vec(&token_data)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let ttl = token_data.expires_at.signed_duration_since(Utc::now());

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        // SET with EX overwrites the previous token atomically.
        let _: () = conn
            .set_ex(&token_key, token_bytes, ttl_seconds)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to store token: {e}")))?;

        tracing::info!(
            purpose = token_data.purpose.as_str(),
            channel = %token_data.channel.kind().as_str(),
            ttl_seconds = ttl_seconds,
            expires_at = %token_data.expires_at,
            "Stored token in Redis"
        );

        Ok(())
    }

    async fn consume_token(&self, channel_id: &str, token: &str) -> Result<Option<TokenData>> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(channel_id);

        let token_bytes: Option<Vec<u8>> = self
            .consume_script
            .key(&token_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to consume token: {e}")))?;

        let Some(bytes) = token_bytes else {
            tracing::debug!("Token not found or mismatched");
            return Ok(None);
        };

        let token_data: TokenData = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let token_matches =
            constant_time_eq::constant_time_eq(token.as_bytes(), token_data.token.as_bytes());

        if !token_matches {
            tracing::warn!("Token consumption failed: script matched but value differs");
            return Ok(None);
        }

        if token_data.is_expired() {
            tracing::warn!(
                expires_at = %token_data.expires_at,
                "Token consumption failed: token expired (TTL should have cleaned this up)"
            );
            return Ok(None);
        }

        tracing::info!(
            purpose = token_data.purpose.as_str(),
            "Token consumed successfully (single-use)"
        );

        Ok(Some(token_data))
    }

    async fn delete_token(&self, channel_id: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(channel_id);

        let deleted: i32 = conn.del(&token_key).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to delete token from Redis: {e}"))
        })?;

        if deleted > 0 {
            tracing::debug!("Deleted token from Redis");
        } else {
            tracing::trace!("Token delete: key not found");
        }

        Ok(())
    }

    async fn exists(&self, channel_id: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(channel_id);

        let exists: bool = conn
            .exists(&token_key)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to check token existence: {e}")))?;

        Ok(exists)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::providers::TokenPurpose;
    use chrono::Duration;

    async fn store() -> RedisTokenStore {
        RedisTokenStore::new("redis://127.0.0.1:6379").await.unwrap()
    }

    fn token_for(channel: &Channel, token: &str, ttl: Duration) -> TokenData {
        TokenData::new(
            TokenPurpose::for_kind(channel.kind()),
            token.to_string(),
            channel.clone(),
            Utc::now() + ttl,
        )
    }

    #[test]
    fn test_key_namespacing() {
        assert_eq!(RedisTokenStore::token_key("a@x.com"), "tokens:a@x.com");
        assert_eq!(
            RedisTokenStore::token_key("+911111111111"),
            "tokens:+911111111111"
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis running at localhost:6379
    async fn test_redis_token_lifecycle() {
        let store = store().await;
        let channel = Channel::Email("lifecycle@example.com".into());
        let id = channel.channel_id();

        store
            .store_token(&id, token_for(&channel, "abc", Duration::minutes(10)))
            .await
            .unwrap();
        assert!(store.exists(&id).await.unwrap());

        let consumed = store.consume_token(&id, "abc").await.unwrap().unwrap();
        assert_eq!(consumed.channel, channel);
        assert!(!store.exists(&id).await.unwrap());

        // Single use
        assert!(store.consume_token(&id, "abc").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_wrong_token_leaves_live_token() {
        let store = store().await;
        let channel = Channel::Email("wrong@example.com".into());
        let id = channel.channel_id();

        store
            .store_token(&id, token_for(&channel, "correct", Duration::minutes(10)))
            .await
            .unwrap();

        assert!(store.consume_token(&id, "guess").await.unwrap().is_none());
        assert!(store.exists(&id).await.unwrap());
        assert!(store.consume_token(&id, "correct").await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_reissue_overwrites() {
        let store = store().await;
        let channel = Channel::phone("+91", "1111111111").unwrap();
        let id = channel.channel_id();

        store
            .store_token(&id, token_for(&channel, "111111", Duration::minutes(10)))
            .await
            .unwrap();
        store
            .store_token(&id, token_for(&channel, "222222", Duration::minutes(10)))
            .await
            .unwrap();

        assert!(store.consume_token(&id, "111111").await.unwrap().is_none());
        assert!(store.consume_token(&id, "222222").await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_token_expiration() {
        let store = store().await;
        let channel = Channel::Email("expiring@example.com".into());
        let id = channel.channel_id();

        store
            .store_token(&id, token_for(&channel, "secret", Duration::seconds(1)))
            .await
            .unwrap();

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert!(store.consume_token(&id, "secret").await.unwrap().is_none());
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_atomic_consumption() {
        let store = store().await;
        let channel = Channel::Email("concurrent@example.com".into());
        let id = channel.channel_id();

        store
            .store_token(&id, token_for(&channel, "secret", Duration::minutes(10)))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.consume_token(&id, "secret").await.unwrap()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1, "Exactly one consume should succeed");
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_idempotent_delete() {
        let store = store().await;
        store.delete_token("never-issued@example.com").await.unwrap();
        store.delete_token("never-issued@example.com").await.unwrap();
    }
}
