//! Mock rate limiter for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::RateLimiter;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock rate limiter.
///
/// Sliding window over in-memory timestamps; check and record happen under
/// one lock.
#[derive(Debug, Clone, Default)]
pub struct MockRateLimiter {
    attempts: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl MockRateLimiter {
    /// Create a new mock rate limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for MockRateLimiter {
    fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl Future<Output = Result<()>> + Send {
        let attempts = Arc::clone(&self.attempts);
        let key = key.to_string();

        async move {
            let mut attempts = lock(&attempts)?;
            let now = Instant::now();
            let timestamps = attempts.entry(key).or_default();
            timestamps.retain(|at| now.duration_since(*at) < window);

            let full = timestamps.len() >= usize::try_from(max_attempts).unwrap_or(usize::MAX);
            timestamps.push(now);
            if full {
                return Err(AuthError::TooManyAttempts { retry_after: window });
            }
            Ok(())
        }
    }

    fn reset(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        let attempts = Arc::clone(&self.attempts);
        let key = key.to_string();

        async move {
            lock(&attempts)?.remove(&key);
            Ok(())
        }
    }

    fn get_attempts(&self, key: &str) -> impl Future<Output = Result<u32>> + Send {
        let attempts = Arc::clone(&self.attempts);
        let key = key.to_string();

        async move {
            let count = lock(&attempts)?.get(&key).map_or(0, Vec::len);
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        }
    }
}
