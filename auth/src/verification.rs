//! Verification State Machine.
//!
//! Each channel is `Unverified` or `Verified`; the only transition is
//! `Unverified -> Verified`, fired by redeeming a token for that exact
//! channel.
//!
//! ```text
//! reference ──decode──▶ (channel_id, token)
//!                           │
//!                           ▼
//!              RateLimiter::check_and_record("redeem:{channel_id}")
//!                           │ within limit          (exhausted: token deleted)
//!                           ▼
//!              TokenStore::consume_token   ◀── linearization point
//!                           │ Some(TokenData)
//!                           ▼
//!              UserRepository::find_by_channel(TokenData.channel)
//!                           │ Some(user)
//!                           ▼
//!              UserRepository::mark_channel_verified (single-flag write)
//! ```

use crate::channel::{Channel, ChannelKind};
use crate::config::AuthConfig;
use crate::constants::metric_names;
use crate::error::{AuthError, Result};
use crate::providers::{RateLimiter, TokenStore, UserRepository};
use crate::state::{ChannelState, User};
use crate::token::OpaqueReference;
use std::time::Duration;

/// Returns `true` if logging in through `kind` must first verify that channel.
#[must_use]
pub const fn verification_required(user: &User, kind: ChannelKind) -> bool {
    matches!(user.channel_state(kind), ChannelState::Unverified)
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct Verified {
    /// User owning the channel, as persisted after the transition.
    pub user: User,

    /// Channel the token was issued for.
    pub channel: Channel,

    /// `true` if this redemption flipped the verified flag.
    pub newly_verified: bool,
}

/// Verification State Machine.
#[derive(Clone, Debug)]
pub struct VerificationMachine<T, U, RL> {
    tokens: T,
    users: U,
    limiter: RL,
    max_attempts: u32,
    window: Duration,
}

impl<T, U, RL> VerificationMachine<T, U, RL>
where
    T: TokenStore,
    U: UserRepository,
    RL: RateLimiter,
{
    /// Create a state machine over the token store, user repository and
    /// attempt limiter.
    #[must_use]
    pub const fn new(tokens: T, users: U, limiter: RL, config: &AuthConfig) -> Self {
        Self {
            tokens,
            users,
            limiter,
            max_attempts: config.redemption_attempts,
            window: config.redemption_window,
        }
    }

    /// Redeem a reference.
    ///
    /// The token is deleted before any other side effect, so a token can be
    /// redeemed at most once even under concurrent attempts. Every attempt
    /// counts against the channel; once the limit is reached the live token
    /// is deleted and later attempts fail until the window rolls over.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenInvalidOrExpired`] if the reference is malformed,
    ///   the token is absent, expired, mismatched or already used, the
    ///   channel is locked out, or no user owns the channel any more
    /// - Store or repository errors otherwise
    pub async fn redeem(&self, reference: &OpaqueReference) -> Result<Verified> {
        let (channel_id, token) = reference.decode().inspect_err(|_| {
            metrics::counter!(metric_names::TOKENS_REJECTED).increment(1);
        })?;

        let attempts_key = format!("redeem:{channel_id}");
        match self
            .limiter
            .check_and_record(&attempts_key, self.max_attempts, self.window)
            .await
        {
            Ok(()) => {}
            Err(AuthError::TooManyAttempts { .. }) => {
                self.tokens.delete_token(&channel_id).await?;
                metrics::counter!(metric_names::TOKENS_REJECTED).increment(1);
                tracing::warn!("Token rejected: too many attempts for channel");
                return Err(AuthError::TokenInvalidOrExpired);
            }
            Err(err) => return Err(err),
        }

        let Some(token_data) = self.tokens.consume_token(&channel_id, &token).await? else {
            metrics::counter!(metric_names::TOKENS_REJECTED).increment(1);
            tracing::warn!("Token rejected: absent, expired or mismatched");
            return Err(AuthError::TokenInvalidOrExpired);
        };
        self.limiter.reset(&attempts_key).await?;

        let channel = token_data.channel;
        if channel.channel_id() != channel_id {
            metrics::counter!(metric_names::TOKENS_REJECTED).increment(1);
            tracing::warn!("Token rejected: stored channel does not match key");
            return Err(AuthError::TokenInvalidOrExpired);
        }

        let Some(owner) = self.users.find_by_channel(&channel).await? else {
            metrics::counter!(metric_names::TOKENS_REJECTED).increment(1);
            tracing::warn!(
                channel = channel.kind().as_str(),
                "Token rejected: channel no longer owned by any user"
            );
            return Err(AuthError::TokenInvalidOrExpired);
        };

        let newly_verified = self
            .users
            .mark_channel_verified(owner.user_id, &channel)
            .await?;
        let user = if newly_verified {
            self.users.get_user_by_id(owner.user_id).await?
        } else {
            owner
        };

        metrics::counter!(metric_names::TOKENS_REDEEMED).increment(1);
        tracing::info!(
            user_id = %user.user_id,
            channel = channel.kind().as_str(),
            newly_verified,
            "Token redeemed"
        );

        Ok(Verified {
            user,
            channel,
            newly_verified,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockRateLimiter, MockTokenStore, MockUserRepository};
    use crate::providers::TokenPurpose;
    use crate::token::TokenIssuer;

    struct Fixture {
        tokens: MockTokenStore,
        users: MockUserRepository,
        issuer: TokenIssuer<MockTokenStore>,
        machine: VerificationMachine<MockTokenStore, MockUserRepository, MockRateLimiter>,
    }

    async fn fixture() -> Fixture {
        let tokens = MockTokenStore::new();
        let users = MockUserRepository::new();

        let mut user = User::new("A".into(), "B".into());
        user.email = Some("a@x.com".into());
        user.phone = Some(crate::channel::PhoneNumber::parse("+91", "1111111111").unwrap());
        users.create_user(&user).await.unwrap();

        let config = AuthConfig::default().with_redemption_limit(3, Duration::from_secs(60));
        Fixture {
            issuer: TokenIssuer::new(tokens.clone(), &config),
            machine: VerificationMachine::new(
                tokens.clone(),
                users.clone(),
                MockRateLimiter::new(),
                &config,
            ),
            tokens,
            users,
        }
    }

    #[tokio::test]
    async fn test_redeem_flips_flag_once() {
        let f = fixture().await;
        let channel = Channel::Email("a@x.com".into());

        let issued = f
            .issuer
            .issue(&channel, TokenPurpose::EmailVerification, None)
            .await
            .unwrap();
        let verified = f.machine.redeem(&issued.reference).await.unwrap();
        assert!(verified.newly_verified);
        assert!(verified.user.email_verified);
        assert!(!verification_required(&verified.user, ChannelKind::Email));
        assert!(verification_required(&verified.user, ChannelKind::Phone));

        // Already verified: succeeds without a redundant write.
        let writes = f.users.writes();
        let issued = f
            .issuer
            .issue(&channel, TokenPurpose::EmailVerification, None)
            .await
            .unwrap();
        let again = f.machine.redeem(&issued.reference).await.unwrap();
        assert!(!again.newly_verified);
        assert_eq!(f.users.writes(), writes);
    }

    #[tokio::test]
    async fn test_phone_redemption_uses_stored_channel() {
        let f = fixture().await;
        let channel = Channel::phone("+91", "1111111111").unwrap();

        let issued = f
            .issuer
            .issue(&channel, TokenPurpose::PhoneVerification, None)
            .await
            .unwrap();
        let verified = f.machine.redeem(&issued.reference).await.unwrap();

        assert_eq!(verified.channel, channel);
        assert!(verified.user.phone_verified);
        assert!(!verified.user.email_verified);
    }

    #[tokio::test]
    async fn test_orphaned_token_is_token_error() {
        let f = fixture().await;
        let channel = Channel::Email("ghost@x.com".into());

        let issued = f
            .issuer
            .issue(&channel, TokenPurpose::EmailVerification, None)
            .await
            .unwrap();
        let err = f.machine.redeem(&issued.reference).await.unwrap_err();

        assert_eq!(err, AuthError::TokenInvalidOrExpired);
        // Consumed all the same.
        assert_eq!(f.tokens.token_for("ghost@x.com").unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_token_error() {
        let f = fixture().await;
        f.tokens.set_unavailable(true);

        let reference = OpaqueReference::encode("a@x.com", "abc");
        let err = f.machine.redeem(&reference).await.unwrap_err();
        assert!(matches!(err, AuthError::CacheError(_)));
    }

    #[tokio::test]
    async fn test_lockout_burns_live_code() {
        let f = fixture().await;
        let channel = Channel::phone("+91", "1111111111").unwrap();
        let issued = f
            .issuer
            .issue(&channel, TokenPurpose::PhoneVerification, None)
            .await
            .unwrap();
        let wrong = if issued.token == "000000" { "111111" } else { "000000" };

        for _ in 0..3 {
            let reference = OpaqueReference::encode(&channel.channel_id(), wrong);
            let err = f.machine.redeem(&reference).await.unwrap_err();
            assert_eq!(err, AuthError::TokenInvalidOrExpired);
        }
        assert!(f.tokens.token_for("+911111111111").unwrap().is_some());

        let err = f.machine.redeem(&issued.reference).await.unwrap_err();
        assert_eq!(err, AuthError::TokenInvalidOrExpired);
        assert_eq!(f.tokens.token_for("+911111111111").unwrap(), None);
        assert!(!f.users.find_by_channel(&channel).await.unwrap().unwrap().phone_verified);
    }

    #[tokio::test]
    async fn test_success_clears_attempts() {
        let f = fixture().await;
        let channel = Channel::Email("a@x.com".into());
        let miss = || OpaqueReference::encode("a@x.com", "not-the-token");

        // Two misses and a success use up the three attempts, then the
        // success clears them so the same pattern works again.
        for _ in 0..2 {
            for _ in 0..2 {
                assert!(f.machine.redeem(&miss()).await.is_err());
            }
            let issued = f
                .issuer
                .issue(&channel, TokenPurpose::EmailVerification, None)
                .await
                .unwrap();
            f.machine.redeem(&issued.reference).await.unwrap();
        }
    }
}
