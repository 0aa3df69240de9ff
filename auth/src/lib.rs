//! # Account Authentication
//!
//! Identity verification and login for an account service.
//!
//! A user reaches the service through an email address, a phone number, or
//! both. Each channel starts unverified and becomes verified when a
//! short-lived, single-use token sent to it is redeemed. Password logins on
//! an unverified channel re-send a token instead of creating a session.
//!
//! ## Components
//!
//! - [`token::TokenIssuer`] - generates tokens, stores them with a TTL and
//!   builds the opaque reference embedded in links
//! - [`credentials::CredentialVerifier`] - resolves the login channel and
//!   checks passwords against the stored hash
//! - [`verification::VerificationMachine`] - redeems references, bounds
//!   attempts per channel and flips verified flags
//! - [`session::SessionIssuer`] - creates, resolves and tears down sessions
//! - [`service::AccountService`] - the operations the HTTP layer calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use account_auth::*;
//!
//! let service = AccountService::new(AuthEnvironment::new(
//!     RedisTokenStore::new(&settings.redis_url).await?,
//!     PostgresUserRepository::new(pool),
//!     RedisSessionStore::new(&settings.redis_url).await?,
//!     Argon2PasswordHasher::new(),
//!     ChannelRouter::new(SmtpEmailDispatcher::new(&settings.smtp), ConsoleDispatcher::new()),
//!     RedisRateLimiter::new(&settings.redis_url).await?,
//!     AuthConfig::from_env()?,
//! ));
//!
//! match service.login(request).await? {
//!     LoginOutcome::Authenticated(session) => { /* set cookie */ }
//!     LoginOutcome::VerificationRequired { channel } => { /* tell the user to check {channel} */ }
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod channel;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod environment;
pub mod error;
pub mod providers;
pub mod service;
pub mod session;
pub mod state;
pub mod stores;
pub mod token;
pub mod utils;
pub mod verification;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use channel::{Channel, ChannelKind, LoginTarget, PhoneNumber};
pub use config::{AuthConfig, ConnectionSettings, TokenPolicy};
pub use environment::AuthEnvironment;
pub use error::{AuthError, ErrorKind, Result};
pub use service::{
    AccountService, LoginOutcome, LoginRequest, ProfileUpdate, ProfileUpdated, Redemption,
    SignupOutcome, SignupRequest, VerificationDispatch,
};
pub use session::ResourceTarget;
pub use state::{LoginMethod, PublicProfile, Session, SessionId, User, UserId};
pub use token::OpaqueReference;
