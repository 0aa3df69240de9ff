//! Session store trait.

use crate::error::Result;
use crate::state::{Session, SessionId};
use chrono::Duration;

/// Session store.
///
/// This trait abstracts over session storage (Redis).
///
/// # Implementation Notes
///
/// - Sessions are TTL-bounded (7 days by default)
/// - Deletion is idempotent
pub trait SessionStore: Send + Sync {
    /// Create session.
    ///
    /// # Arguments
    ///
    /// - `session`: Session to create
    /// - `ttl`: Time to live
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn create_session(
        &self,
        session: &Session,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Get session.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage operation fails
    /// - Session not found → `AuthError::SessionNotFound`
    /// - Session expired → `AuthError::SessionExpired`
    fn get_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Delete session. Deleting an absent session is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check if session exists and is not expired.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn exists(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
