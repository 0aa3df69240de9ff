//! Redis-based rate limiter.
//!
//! Sliding window over a sorted set per key (`rate_limit:{key}`), scored by
//! the attempt time in milliseconds:
//! 1. Drop entries older than the window (`ZREMRANGEBYSCORE`)
//! 2. Count what is left (`ZCARD`)
//! 3. Add this attempt (`ZADD`)
//! 4. Refresh the key's TTL (`EXPIRE`)
//!
//! All four run in one `MULTI` pipeline.

use crate::error::{AuthError, Result};
use crate::providers::RateLimiter;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// `Redis`-based sliding-window rate limiter.
///
/// # Example
///
/// ```no_run
/// use account_auth::stores::RedisRateLimiter;
/// use account_auth::providers::RateLimiter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = RedisRateLimiter::new("redis://127.0.0.1:6379").await?;
///
/// limiter
///     .check_and_record("redeem:user@example.com", 5, std::time::Duration::from_secs(900))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisRateLimiter {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisRateLimiter {
    /// Create a new `Redis` rate limiter.
    ///
    /// # Errors
    ///
    /// Returns error if connection to `Redis` fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::CacheError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Build a limiter over an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn rate_limit_key(key: &str) -> String {
        format!("rate_limit:{key}")
    }

    #[allow(clippy::cast_possible_truncation)]
    fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

impl RateLimiter for RedisRateLimiter {
    async fn check_and_record(&self, key: &str, max_attempts: u32, window: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let rate_key = Self::rate_limit_key(key);
        let now_ms = Self::current_timestamp_ms();
        #[allow(clippy::cast_possible_truncation)]
        let window_ms = window.as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);
        // Unique member: two attempts in the same millisecond both count.
        let member = format!("{now_ms}:{}", Uuid::new_v4());
        let ttl_seconds = i64::try_from(window.as_secs().max(1)).unwrap_or(i64::MAX);

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .zrembyscore(&rate_key, 0, window_start as isize)
            .ignore()
            .zcard(&rate_key)
            .zadd(&rate_key, member, now_ms)
            .ignore()
            .expire(&rate_key, ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Rate limit pipeline failed");
                AuthError::CacheError(format!("Failed to check and record rate limit: {e}"))
            })?;

        if count >= u64::from(max_attempts) {
            tracing::warn!(
                attempts = count + 1,
                max_attempts,
                window_ms,
                "Rate limit exceeded"
            );
            return Err(AuthError::TooManyAttempts { retry_after: window });
        }

        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(Self::rate_limit_key(key))
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to reset rate limit: {e}")))?;

        Ok(())
    }

    async fn get_attempts(&self, key: &str) -> Result<u32> {
        let mut conn = self.conn_manager.clone();

        let count: u64 = conn
            .zcard(Self::rate_limit_key(key))
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to get rate limit attempts: {e}")))?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
