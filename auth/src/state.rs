//! Identity and session types.
//!
//! All types are `Clone` and serializable so the Redis and Postgres
//! adapters can persist them directly.

use crate::channel::{Channel, ChannelKind, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// Default role assigned at signup.
pub const DEFAULT_ROLE: &str = "student";

/// Verification state of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// Channel has never been proven reachable (or changed since).
    Unverified,

    /// A token sent to the channel has been redeemed.
    Verified,
}

/// User record, owned by the user repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub user_id: UserId,

    /// First name.
    pub first_name: String,

    /// Last name.
    pub last_name: String,

    /// Email address (globally unique when present).
    pub email: Option<String>,

    /// Email verified flag.
    pub email_verified: bool,

    /// Phone number (`(country_code, number)` globally unique when present).
    pub phone: Option<PhoneNumber>,

    /// Phone verified flag.
    pub phone_verified: bool,

    /// Password hash (PHC string). `None` for token-only accounts.
    pub password_hash: Option<String>,

    /// Profile picture URL.
    pub profile_pic_url: Option<String>,

    /// Authorization role.
    pub role: String,

    /// Account created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create an unverified user with the default role.
    #[must_use]
    pub fn new(first_name: String, last_name: String) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            first_name,
            last_name,
            email: None,
            email_verified: false,
            phone: None,
            phone_verified: false,
            password_hash: None,
            profile_pic_url: None,
            role: DEFAULT_ROLE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The user's channel of the given kind, if present.
    #[must_use]
    pub fn channel(&self, kind: ChannelKind) -> Option<Channel> {
        match kind {
            ChannelKind::Email => self.email.clone().map(Channel::Email),
            ChannelKind::Phone => self.phone.clone().map(Channel::Phone),
        }
    }

    /// Verification state of the channel of the given kind.
    ///
    /// A missing channel reports [`ChannelState::Unverified`].
    #[must_use]
    pub const fn channel_state(&self, kind: ChannelKind) -> ChannelState {
        let verified = match kind {
            ChannelKind::Email => self.email.is_some() && self.email_verified,
            ChannelKind::Phone => self.phone.is_some() && self.phone_verified,
        };
        if verified {
            ChannelState::Verified
        } else {
            ChannelState::Unverified
        }
    }

    /// Returns `true` if `channel` is exactly one of this user's channels.
    #[must_use]
    pub fn owns(&self, channel: &Channel) -> bool {
        match channel {
            Channel::Email(address) => self.email.as_deref() == Some(address.as_str()),
            Channel::Phone(phone) => self.phone.as_ref() == Some(phone),
        }
    }

    /// Flip the verified flag for `kind`.
    ///
    /// Returns `true` only if the flag changed.
    pub fn mark_verified(&mut self, kind: ChannelKind) -> bool {
        let flag = match kind {
            ChannelKind::Email => &mut self.email_verified,
            ChannelKind::Phone => &mut self.phone_verified,
        };
        if *flag {
            return false;
        }
        *flag = true;
        self.updated_at = Utc::now();
        true
    }

    /// Retrievable subset of the profile.
    #[must_use]
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            profile_pic_url: self.profile_pic_url.clone(),
        }
    }
}

/// Profile fields a user may read about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    /// User ID.
    pub user_id: UserId,

    /// First name.
    pub first_name: String,

    /// Last name.
    pub last_name: String,

    /// Email address.
    pub email: Option<String>,

    /// Phone number.
    pub phone: Option<PhoneNumber>,

    /// Profile picture URL.
    pub profile_pic_url: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════

/// How a session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginMethod {
    /// Password match on a verified channel.
    Password,

    /// Verification token redemption ("magic" login).
    Token,
}

impl LoginMethod {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Token => "token",
        }
    }
}

/// Authenticated session.
///
/// Carries only what downstream authorization checks need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (the handle given to the caller).
    pub session_id: SessionId,

    /// Authenticated user.
    pub user_id: UserId,

    /// User's role at login time.
    pub role: String,

    /// How the session was obtained.
    pub login_method: LoginMethod,

    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Session expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` once `expires_at` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_channels() -> User {
        let mut user = User::new("Test".into(), "User".into());
        user.email = Some("a@x.com".into());
        user.phone = Some(PhoneNumber {
            country_code: "+91".into(),
            number: "1111111111".into(),
        });
        user
    }

    #[test]
    fn test_user_id_generation() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_new_user_is_unverified_student() {
        let user = user_with_channels();
        assert_eq!(user.role, DEFAULT_ROLE);
        assert_eq!(user.channel_state(ChannelKind::Email), ChannelState::Unverified);
        assert_eq!(user.channel_state(ChannelKind::Phone), ChannelState::Unverified);
    }

    #[test]
    fn test_mark_verified_flips_once() {
        let mut user = user_with_channels();
        assert!(user.mark_verified(ChannelKind::Email));
        assert!(!user.mark_verified(ChannelKind::Email));
        assert_eq!(user.channel_state(ChannelKind::Email), ChannelState::Verified);
        assert_eq!(user.channel_state(ChannelKind::Phone), ChannelState::Unverified);
    }

    #[test]
    fn test_missing_channel_is_never_verified() {
        let mut user = User::new("Test".into(), "User".into());
        user.email_verified = true;
        assert_eq!(user.channel_state(ChannelKind::Email), ChannelState::Unverified);
    }

    #[test]
    fn test_owns_matches_exact_channel() {
        let user = user_with_channels();
        assert!(user.owns(&Channel::Email("a@x.com".into())));
        assert!(!user.owns(&Channel::Email("b@x.com".into())));
        assert!(user.owns(&Channel::Phone(PhoneNumber {
            country_code: "+91".into(),
            number: "1111111111".into(),
        })));
        assert!(!user.owns(&Channel::Phone(PhoneNumber {
            country_code: "+1".into(),
            number: "1111111111".into(),
        })));
    }
}
