//! Token store trait.
//!
//! This module defines the trait for storing and redeeming verification
//! tokens with atomic single-use semantics. At most one token is live per
//! channel identifier: storing a new one overwrites the old.

use crate::channel::{Channel, ChannelKind};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a token was issued for.
///
/// The purpose selects the alphabet, length and lifetime of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenPurpose {
    /// Long lowercase token embedded in an email link.
    EmailVerification,

    /// Short numeric code sent by SMS.
    PhoneVerification,
}

impl TokenPurpose {
    /// Purpose matching a channel kind.
    #[must_use]
    pub const fn for_kind(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Email => Self::EmailVerification,
            ChannelKind::Phone => Self::PhoneVerification,
        }
    }

    /// Characters tokens of this purpose are drawn from.
    #[must_use]
    pub const fn alphabet(self) -> &'static [u8] {
        match self {
            Self::EmailVerification => b"abcdefghijklmnopqrstuvwxyz",
            Self::PhoneVerification => b"0123456789",
        }
    }

    /// Stable lowercase label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PhoneVerification => "phone_verification",
        }
    }
}

/// Token data stored in the token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Token purpose.
    pub purpose: TokenPurpose,

    /// Token value.
    pub token: String,

    /// Channel the token proves control of.
    pub channel: Channel,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Expiration time.
    pub expires_at: DateTime<Utc>,
}

impl TokenData {
    /// Create new token data.
    #[must_use]
    pub fn new(
        purpose: TokenPurpose,
        token: String,
        channel: Channel,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            purpose,
            token,
            channel,
            created_at: Utc::now(),
            expires_at,
        }
    }

    /// Returns `true` once `expires_at` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Token store.
///
/// This trait abstracts over verification token storage keyed by channel
/// identifier.
///
/// # Implementation Notes
///
/// - Tokens are ephemeral (minutes-scale `TTL`); expired tokens behave as absent
/// - `store_token()` overwrites any live token for the same channel identifier
/// - **CRITICAL**: `consume_token()` MUST be atomic
///
/// # Security Requirements
///
/// 1. **Atomicity**: `consume_token()` must atomically check and delete
/// 2. **Single-use**: Once consumed, token cannot be reused
/// 3. **Expiration**: Expired tokens must be rejected
/// 4. **Wrong guesses do not burn the token**: a mismatched token leaves
///    the live token in place
pub trait TokenStore: Send + Sync {
    /// Store a token, replacing any live token for `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails; in that case nothing
    /// was stored.
    fn store_token(
        &self,
        channel_id: &str,
        token_data: TokenData,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Consume a token atomically.
    ///
    /// Deletes and returns the live token for `channel_id` only if it equals
    /// `token` and has not expired. The deletion is the linearization point:
    /// of two concurrent calls presenting the same valid token, exactly one
    /// gets `Some`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(TokenData))`: Token was valid, not expired, and has been consumed
    /// - `Ok(None)`: Token not found, expired, or doesn't match
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn consume_token(
        &self,
        channel_id: &str,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<TokenData>>> + Send;

    /// Delete the live token for `channel_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_token(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check whether a live token exists for `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn exists(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
