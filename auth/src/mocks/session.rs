//! Mock session store for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::SessionStore;
use crate::state::{Session, SessionId};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock session store.
///
/// Uses in-memory storage; expiry follows `Session::expires_at`.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired or not.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(lock(&self.sessions)?.len())
    }
}

impl SessionStore for MockSessionStore {
    async fn create_session(&self, session: &Session, _ttl: Duration) -> Result<()> {
        let mut sessions = lock(&self.sessions)?;
        if sessions.contains_key(&session.session_id) {
            return Err(AuthError::InternalError(
                "Session ID already exists".to_string(),
            ));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session> {
        let session = lock(&self.sessions)?
            .get(&session_id)
            .cloned()
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired() {
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<()> {
        lock(&self.sessions)?.remove(&session_id);
        Ok(())
    }

    async fn exists(&self, session_id: SessionId) -> Result<bool> {
        Ok(lock(&self.sessions)?
            .get(&session_id)
            .is_some_and(|session| !session.is_expired()))
    }
}
