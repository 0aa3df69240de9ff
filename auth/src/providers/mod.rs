//! Collaborator traits and their production implementations.
//!
//! The core depends on these traits only; concrete adapters are chosen by
//! whoever builds the [`AuthEnvironment`](crate::environment::AuthEnvironment).
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │ AccountService   │─────▶│ TokenStore       │  Redis / in-memory
//! │                  │─────▶│ UserRepository   │  Postgres / in-memory
//! │                  │─────▶│ SessionStore     │  Redis / in-memory
//! │                  │─────▶│ PasswordHasher   │  Argon2id
//! │                  │─────▶│ MessageDispatcher│  SMTP / console
//! │                  │─────▶│ RateLimiter      │  Redis / in-memory
//! └──────────────────┘      └──────────────────┘
//! ```
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use real services (Redis, PostgreSQL, SMTP)
//! - **Development**: Log messages to the console instead of sending them

pub mod console;
pub mod dispatcher;
pub mod hasher;
pub mod rate_limiter;
pub mod session;
pub mod smtp_email;
pub mod token_store;
pub mod user;

pub use console::ConsoleDispatcher;
pub use dispatcher::{ChannelRouter, MessageDispatcher, OutboundMessage, TemplateKind};
pub use hasher::{Argon2PasswordHasher, PasswordHasher};
pub use rate_limiter::RateLimiter;
pub use session::SessionStore;
pub use smtp_email::SmtpEmailDispatcher;
pub use token_store::{TokenData, TokenPurpose, TokenStore};
pub use user::UserRepository;
