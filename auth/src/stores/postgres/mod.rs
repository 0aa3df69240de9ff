//! PostgreSQL storage implementations.
//!
//! The `users` table is the source of truth for contact channels and their
//! verified flags. Schema lives in `auth/migrations/`.

pub mod user;

// Re-exports
pub use user::PostgresUserRepository;
