//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

use crate::error::{AuthError, Result};
use std::sync::{Mutex, MutexGuard};

pub mod dispatcher;
pub mod hasher;
pub mod rate_limiter;
pub mod session;
pub mod token_store;
pub mod user;

pub use dispatcher::RecordingDispatcher;
pub use hasher::MockPasswordHasher;
pub use rate_limiter::MockRateLimiter;
pub use session::MockSessionStore;
pub use token_store::MockTokenStore;
pub use user::MockUserRepository;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
}
