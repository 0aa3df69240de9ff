//! Session Issuer.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{LoginMethod, Session, SessionId, User, UserId};
use chrono::{Duration, Utc};
use std::str::FromStr;

/// Whose resource a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTarget {
    /// The caller's own resource (`"me"`).
    Me,

    /// A specific user.
    User(UserId),
}

impl FromStr for ResourceTarget {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "me" {
            return Ok(Self::Me);
        }
        uuid::Uuid::parse_str(s)
            .map(|id| Self::User(UserId(id)))
            .map_err(|_| AuthError::Validation(format!("userId - invalid value {s:?}")))
    }
}

/// Session Issuer.
///
/// Creates sessions after a password match on a verified channel or a token
/// redemption, and answers "who is calling" for later requests.
#[derive(Clone, Debug)]
pub struct SessionIssuer<S> {
    store: S,
    duration: Duration,
}

impl<S: SessionStore> SessionIssuer<S> {
    /// Create an issuer whose sessions live for `duration`.
    #[must_use]
    pub const fn new(store: S, duration: Duration) -> Self {
        Self { store, duration }
    }

    /// Establish a session bound to `user`.
    ///
    /// # Errors
    ///
    /// Returns the session store's error.
    pub async fn establish(&self, user: &User, method: LoginMethod) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            session_id: SessionId::new(),
            user_id: user.user_id,
            role: user.role.clone(),
            login_method: method,
            created_at: now,
            expires_at: now + self.duration,
        };

        self.store.create_session(&session, self.duration).await?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            method = method.as_str(),
            "Session established"
        );

        Ok(session)
    }

    /// Invalidate a session. Tearing down an absent session succeeds.
    ///
    /// # Errors
    ///
    /// Returns the session store's error.
    pub async fn tear_down(&self, session_id: SessionId) -> Result<()> {
        self.store.delete_session(session_id).await?;
        tracing::info!(session_id = %session_id, "Session torn down");
        Ok(())
    }

    /// Resolve a session handle.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] for unknown or expired
    /// sessions, or the store's error.
    pub async fn authenticate(&self, session_id: SessionId) -> Result<Session> {
        match self.store.get_session(session_id).await {
            Ok(session) => Ok(session),
            Err(AuthError::SessionNotFound | AuthError::SessionExpired) => {
                Err(AuthError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }
}

/// Check that `target` is the caller's own resource.
///
/// # Errors
///
/// Returns [`AuthError::NotAuthorized`] when `target` names another user.
pub fn ensure_owner(session: &Session, target: ResourceTarget) -> Result<UserId> {
    match target {
        ResourceTarget::Me => Ok(session.user_id),
        ResourceTarget::User(user_id) if user_id == session.user_id => Ok(user_id),
        ResourceTarget::User(_) => Err(AuthError::NotAuthorized),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockSessionStore;

    fn issuer() -> (MockSessionStore, SessionIssuer<MockSessionStore>) {
        let store = MockSessionStore::new();
        (store.clone(), SessionIssuer::new(store, Duration::days(7)))
    }

    #[tokio::test]
    async fn test_establish_and_tear_down() {
        let (store, issuer) = issuer();
        let user = User::new("A".into(), "B".into());

        let session = issuer.establish(&user, LoginMethod::Password).await.unwrap();
        assert_eq!(session.user_id, user.user_id);
        assert_eq!(session.role, user.role);
        assert_eq!(store.count().unwrap(), 1);

        assert_eq!(issuer.authenticate(session.session_id).await.unwrap(), session);

        issuer.tear_down(session.session_id).await.unwrap();
        issuer.tear_down(session.session_id).await.unwrap();
        assert_eq!(
            issuer.authenticate(session.session_id).await.unwrap_err(),
            AuthError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_expired_session_is_not_authenticated() {
        let store = MockSessionStore::new();
        let issuer = SessionIssuer::new(store, Duration::seconds(-1));
        let user = User::new("A".into(), "B".into());

        let session = issuer.establish(&user, LoginMethod::Token).await.unwrap();
        assert_eq!(
            issuer.authenticate(session.session_id).await.unwrap_err(),
            AuthError::NotAuthenticated
        );
    }

    #[test]
    fn test_resource_target_parsing_and_ownership() {
        let user = User::new("A".into(), "B".into());
        let session = Session {
            session_id: SessionId::new(),
            user_id: user.user_id,
            role: user.role.clone(),
            login_method: LoginMethod::Password,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(1),
        };

        let me: ResourceTarget = "me".parse().unwrap();
        let own: ResourceTarget = user.user_id.to_string().parse().unwrap();
        let other: ResourceTarget = UserId::new().to_string().parse().unwrap();

        assert_eq!(ensure_owner(&session, me).unwrap(), user.user_id);
        assert_eq!(ensure_owner(&session, own).unwrap(), user.user_id);
        assert_eq!(ensure_owner(&session, other).unwrap_err(), AuthError::NotAuthorized);
        assert!("someone".parse::<ResourceTarget>().is_err());
    }
}
