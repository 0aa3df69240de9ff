//! Authentication environment.
//!
//! Every external handle the core needs, passed in at construction.

use crate::config::AuthConfig;
use crate::providers::{
    MessageDispatcher, PasswordHasher, RateLimiter, SessionStore, TokenStore, UserRepository,
};

/// Authentication environment.
///
/// # Type Parameters
///
/// - `T`: Token store
/// - `U`: User repository
/// - `S`: Session store
/// - `H`: Password hasher
/// - `D`: Message dispatcher
/// - `RL`: Rate limiter
#[derive(Clone, Debug)]
pub struct AuthEnvironment<T, U, S, H, D, RL>
where
    T: TokenStore + Clone,
    U: UserRepository + Clone,
    S: SessionStore + Clone,
    H: PasswordHasher + Clone,
    D: MessageDispatcher + Clone,
    RL: RateLimiter + Clone,
{
    /// Token store (`Redis` - one live token per channel, conditional consumption).
    pub tokens: T,

    /// User repository (`PostgreSQL`).
    pub users: U,

    /// Session store (`Redis`).
    pub sessions: S,

    /// Password hasher (Argon2id).
    pub hasher: H,

    /// Email / SMS dispatcher.
    pub dispatcher: D,

    /// Redemption attempt limiter (`Redis`).
    pub rate_limiter: RL,

    /// Configuration.
    pub config: AuthConfig,
}

impl<T, U, S, H, D, RL> AuthEnvironment<T, U, S, H, D, RL>
where
    T: TokenStore + Clone,
    U: UserRepository + Clone,
    S: SessionStore + Clone,
    H: PasswordHasher + Clone,
    D: MessageDispatcher + Clone,
    RL: RateLimiter + Clone,
{
    /// Create a new authentication environment.
    #[must_use]
    pub const fn new(
        tokens: T,
        users: U,
        sessions: S,
        hasher: H,
        dispatcher: D,
        rate_limiter: RL,
        config: AuthConfig,
    ) -> Self {
        Self {
            tokens,
            users,
            sessions,
            hasher,
            dispatcher,
            rate_limiter,
            config,
        }
    }
}
