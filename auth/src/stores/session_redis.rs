//! Redis-based session store implementation.
//!
//! # Architecture
//!
//! Sessions are stored in Redis with:
//! - **Primary key**: `session:{session_id}` → bincode-serialized Session
//! - **TTL**: the configured session duration
//!
//! # Example
//!
//! ```no_run
//! use account_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{Session, SessionId};
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::CacheError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self::from_manager(conn_manager))
    }

    /// Build a store over an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    /// Get the Redis key for a session.
    fn session_key(session_id: &SessionId) -> String {
        format!("session:{}", session_id.0)
    }
}

impl SessionStore for RedisSessionStore {
    async fn create_session(&self, session: &Session, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(&session.session_id);

        let session_bytes =
            bincode::serialize(session).map_err(|e| AuthError::SerializationError(e.to_string()))?;

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        // NX: a session id is never reused.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&session_key)
            .arg(session_bytes)
            .arg("EX")
            .arg(ttl_seconds)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to create session: {e}")))?;

        if reply.is_none() {
            return Err(AuthError::InternalError(
                "Session ID already exists".to_string(),
            ));
        }

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            ttl_seconds = ttl_seconds,
            "Created session in Redis"
        );

        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(&session_id);

        let session_bytes: Option<Vec<u8>> = conn.get(&session_key).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to get session from Redis: {e}"))
        })?;

        let Some(bytes) = session_bytes else {
            return Err(AuthError::SessionNotFound);
        };

        let session: Session = bincode::deserialize(&bytes)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        if session.is_expired() {
            tracing::warn!(
                session_id = %session_id,
                expires_at = %session.expires_at,
                "Session expired (TTL should have cleaned this up)"
            );
            return Err(AuthError::SessionExpired);
        }

        Ok(session)
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(&session_id);

        let deleted: i32 = conn.del(&session_key).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to delete session from Redis: {e}"))
        })?;

        if deleted > 0 {
            tracing::info!(session_id = %session_id, "Deleted session from Redis");
        } else {
            tracing::trace!(session_id = %session_id, "Session delete: key not found");
        }

        Ok(())
    }

    async fn exists(&self, session_id: SessionId) -> Result<bool> {
        match self.get_session(session_id).await {
            Ok(_) => Ok(true),
            Err(AuthError::SessionNotFound | AuthError::SessionExpired) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
