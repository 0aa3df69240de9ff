//! Mock user repository for testing.

use crate::channel::{Channel, PhoneNumber};
use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::UserRepository;
use crate::state::{User, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock user repository.
///
/// Uses in-memory storage for testing, enforcing the same uniqueness rules
/// as the `users` table. Counts writes so tests can assert that no redundant
/// write happened.
#[derive(Debug, Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    writes: Arc<AtomicUsize>,
}

impl MockUserRepository {
    /// Create a new mock user repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that changed a stored user.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored users.
    ///
    /// # Errors
    ///
    /// Returns error if the mutex is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(lock(&self.users)?.len())
    }
}

/// Conflict with any user other than `user`, email checked first.
fn conflict(users: &HashMap<UserId, User>, user: &User) -> Option<AuthError> {
    let others = || users.values().filter(move |other| other.user_id != user.user_id);

    if user.email.is_some() && others().any(|other| other.email == user.email) {
        return Some(AuthError::EmailTaken);
    }
    if user.phone.is_some() && others().any(|other| other.phone == user.phone) {
        return Some(AuthError::PhoneTaken);
    }
    None
}

impl UserRepository for MockUserRepository {
    fn get_user_by_id(&self, user_id: UserId) -> impl Future<Output = Result<User>> + Send {
        let users = Arc::clone(&self.users);

        async move {
            lock(&users)?
                .get(&user_id)
                .cloned()
                .ok_or(AuthError::ResourceNotFound)
        }
    }

    fn find_by_email(&self, email: &str) -> impl Future<Output = Result<Option<User>>> + Send {
        let users = Arc::clone(&self.users);
        let email = email.to_string();

        async move {
            Ok(lock(&users)?
                .values()
                .find(|user| user.email.as_deref() == Some(email.as_str()))
                .cloned())
        }
    }

    fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> impl Future<Output = Result<Option<User>>> + Send {
        let users = Arc::clone(&self.users);
        let phone = phone.clone();

        async move {
            Ok(lock(&users)?
                .values()
                .find(|user| user.phone.as_ref() == Some(&phone))
                .cloned())
        }
    }

    fn create_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send {
        let users = Arc::clone(&self.users);
        let writes = Arc::clone(&self.writes);
        let user = user.clone();

        async move {
            let mut users = lock(&users)?;
            if let Some(err) = conflict(&users, &user) {
                return Err(err);
            }
            users.insert(user.user_id, user.clone());
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(user)
        }
    }

    fn update_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send {
        let users = Arc::clone(&self.users);
        let writes = Arc::clone(&self.writes);
        let user = user.clone();

        async move {
            let mut users = lock(&users)?;
            let mut user = user;
            let Some(stored) = users.get(&user.user_id) else {
                return Err(AuthError::ResourceNotFound);
            };
            if stored.email == user.email {
                user.email_verified |= stored.email_verified;
            }
            if stored.phone == user.phone {
                user.phone_verified |= stored.phone_verified;
            }
            if let Some(err) = conflict(&users, &user) {
                return Err(err);
            }
            users.insert(user.user_id, user.clone());
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(user)
        }
    }

    fn mark_channel_verified(
        &self,
        user_id: UserId,
        channel: &Channel,
    ) -> impl Future<Output = Result<bool>> + Send {
        let users = Arc::clone(&self.users);
        let writes = Arc::clone(&self.writes);
        let channel = channel.clone();

        async move {
            let mut users = lock(&users)?;
            let Some(user) = users.get_mut(&user_id) else {
                return Ok(false);
            };
            if !user.owns(&channel) || !user.mark_verified(channel.kind()) {
                return Ok(false);
            }
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }
}
