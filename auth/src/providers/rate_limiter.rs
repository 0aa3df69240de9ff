//! Rate limiter trait for redemption attempts.

use crate::error::Result;
use std::time::Duration;

/// Sliding-window attempt counter.
///
/// Keys are opaque strings chosen by the caller; the verification machine
/// uses one key per channel so guesses against an SMS code are bounded no
/// matter who sends them.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key`, failing if the window is already full.
    ///
    /// The check and the record happen as one step, so concurrent callers
    /// cannot all slip in under the limit.
    ///
    /// # Errors
    ///
    /// - `AuthError::TooManyAttempts` if `max_attempts` attempts were already
    ///   recorded within `window`
    /// - Backend errors otherwise
    fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Forget every attempt recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend operation fails.
    fn reset(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Number of attempts currently recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend operation fails.
    fn get_attempts(&self, key: &str) -> impl std::future::Future<Output = Result<u32>> + Send;
}
