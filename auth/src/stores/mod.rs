//! Storage implementations for the auth system.
//!
//! - **Token Store** (Redis) - Verification tokens with conditional atomic consumption
//! - **Session Store** (Redis) - Ephemeral session storage with TTL
//! - **Rate Limiter** (Redis) - Sliding-window redemption attempt counts
//! - **User Repository** (PostgreSQL, feature `postgres`) - Users and verified flags

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod rate_limiter_redis;
pub mod session_redis;
pub mod token_redis;

// Re-exports
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserRepository;
pub use rate_limiter_redis::RedisRateLimiter;
pub use session_redis::RedisSessionStore;
pub use token_redis::RedisTokenStore;
