//! User repository trait.

use crate::channel::{Channel, PhoneNumber};
use crate::error::Result;
use crate::state::{User, UserId};

/// User repository.
///
/// This trait abstracts over the relational user store. It is the single
/// source of truth for verified flags; callers re-read on every decision
/// and never cache users across requests.
pub trait UserRepository: Send + Sync {
    /// Get user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - User not found → `AuthError::ResourceNotFound`
    fn get_user_by_id(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<User>> + Send;

    /// Find user by email.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    /// Find user by `(country_code, number)`.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    /// Create user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Email already exists → `AuthError::EmailTaken`
    /// - Phone already exists → `AuthError::PhoneTaken`
    fn create_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User>> + Send;

    /// Update user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - User not found → `AuthError::ResourceNotFound`
    /// - New email or phone collides with another user
    fn update_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User>> + Send;

    /// Set the verified flag for `channel` on `user_id` and bump `updated_at`.
    ///
    /// Touches that one flag only, and only while the user still owns
    /// `channel` and the flag is still unset, so concurrent redemptions and
    /// profile edits never overwrite each other.
    ///
    /// Returns `true` if the flag changed.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn mark_channel_verified(
        &self,
        user_id: UserId,
        channel: &Channel,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Find the user owning `channel`.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_channel(
        &self,
        channel: &Channel,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send {
        async move {
            match channel {
                Channel::Email(address) => self.find_by_email(address).await,
                Channel::Phone(phone) => self.find_by_phone(phone).await,
            }
        }
    }
}
