//! Recording dispatcher for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::{MessageDispatcher, OutboundMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Recording dispatcher.
///
/// Records every message instead of delivering it. Can be switched into a
/// failing mode to exercise dispatch errors.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    should_fail: Arc<AtomicBool>,
}

impl RecordingDispatcher {
    /// Create a dispatcher that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (the message is still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    /// All messages sent so far.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn sent(&self) -> Result<Vec<OutboundMessage>> {
        Ok(lock(&self.sent)?.clone())
    }

    /// Number of messages sent so far.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(lock(&self.sent)?.len())
    }

    /// Most recent message.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn last(&self) -> Result<Option<OutboundMessage>> {
        Ok(lock(&self.sent)?.last().cloned())
    }
}

impl MessageDispatcher for RecordingDispatcher {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        lock(&self.sent)?.push(message);

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AuthError::DispatchFailed("simulated failure".to_string()));
        }
        Ok(())
    }
}
