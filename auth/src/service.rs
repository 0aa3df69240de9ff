//! Account service.
//!
//! The operations exposed to the HTTP layer. Each one re-reads the user
//! repository; nothing is cached between calls.
//!
//! # Login
//!
//! ```text
//! resolve channel ──▶ find user ──▶ check password ──▶ channel verified?
//!       │                 │               │              │         │
//!   Validation     InvalidCredentials  InvalidCredentials yes       no
//!                                                        │         │
//!                                                     session   re-issue token
//! ```
//!
//! The password must match before a token is re-issued, so an anonymous
//! caller cannot make the service send verification messages.

use crate::channel::{Channel, ChannelKind, PhoneNumber};
use crate::config::AuthConfig;
use crate::constants::{messages, metric_names};
use crate::credentials::CredentialVerifier;
use crate::environment::AuthEnvironment;
use crate::error::{AuthError, Result};
use crate::providers::{
    MessageDispatcher, OutboundMessage, PasswordHasher, RateLimiter, SessionStore, TokenPurpose,
    TokenStore, UserRepository,
};
use crate::session::{ResourceTarget, SessionIssuer, ensure_owner};
use crate::state::{LoginMethod, PublicProfile, Session, SessionId, User, UserId};
use crate::token::{IssuedToken, OpaqueReference, TokenIssuer, decode_redirect};
use crate::verification::{VerificationMachine, verification_required};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Signup request.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// First name.
    pub first_name: String,

    /// Last name.
    pub last_name: String,

    /// Email address.
    pub email: Option<String>,

    /// Phone country code (`+` and 1-3 digits), required with `phone`.
    pub phone_country_code: Option<String>,

    /// Phone number.
    pub phone: Option<String>,

    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_country_code", &self.phone_country_code)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of a successful signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    /// A verification link went to the new user's email.
    VerificationEmailSent {
        /// The new user.
        user_id: UserId,
    },

    /// A verification code went to the new user's phone.
    VerificationSmsSent {
        /// The new user.
        user_id: UserId,
    },
}

impl SignupOutcome {
    /// Message code for the response body.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::VerificationEmailSent { .. } => messages::VERIFICATION_EMAIL_SENT,
            Self::VerificationSmsSent { .. } => messages::VERIFICATION_SMS_SENT,
        }
    }

    /// The new user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::VerificationEmailSent { user_id } | Self::VerificationSmsSent { user_id } => {
                *user_id
            }
        }
    }
}

/// Password login request.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or phone number.
    pub identifier: String,

    /// Country code, required when `identifier` is a phone number.
    pub phone_country_code: Option<String>,

    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("phone_country_code", &self.phone_country_code)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of a password login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Password matched on a verified channel.
    Authenticated(Session),

    /// Password matched but the channel is unverified; a fresh token was sent.
    VerificationRequired {
        /// Channel the token went to.
        channel: Channel,
    },
}

/// Answer to a verification-token request.
///
/// The same answer is given whether or not the channel belongs to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationDispatch {
    /// Kind of channel addressed.
    pub kind: ChannelKind,
}

impl VerificationDispatch {
    /// `EMAIL_MAYBE_SENT` or `SMS_MAYBE_SENT`.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self.kind {
            ChannelKind::Email => messages::EMAIL_MAYBE_SENT,
            ChannelKind::Phone => messages::SMS_MAYBE_SENT,
        }
    }
}

/// A redeemed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    /// Session established for the channel's owner.
    pub session: Session,

    /// Channel that was verified.
    pub channel: Channel,

    /// `true` if this redemption flipped the verified flag.
    pub newly_verified: bool,

    /// Decoded redirect target, if one accompanied the reference.
    pub redirect: Option<String>,
}

impl Redemption {
    /// Message code for the response body when there is no redirect.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        messages::LOGIN_SUCCESSFUL
    }
}

/// Profile changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New first name.
    pub first_name: Option<String>,

    /// New last name.
    pub last_name: Option<String>,

    /// New profile picture URL.
    pub profile_pic_url: Option<String>,

    /// New email address.
    pub email: Option<String>,

    /// New phone country code.
    pub phone_country_code: Option<String>,

    /// New phone number.
    pub phone: Option<String>,
}

/// Outcome of a profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdated {
    /// Profile as persisted.
    pub profile: PublicProfile,

    /// Channels that changed and were sent a verification token.
    pub verification_sent: Vec<ChannelKind>,
}

impl ProfileUpdated {
    /// `UPDATE_SUCCESSFUL`.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        messages::UPDATE_SUCCESSFUL
    }
}

/// Account service.
///
/// # Type Parameters
///
/// - `T`: Token store
/// - `U`: User repository
/// - `S`: Session store
/// - `H`: Password hasher
/// - `D`: Message dispatcher
/// - `RL`: Rate limiter
#[derive(Clone, Debug)]
pub struct AccountService<T, U, S, H, D, RL> {
    tokens: TokenIssuer<T>,
    credentials: CredentialVerifier<U, H>,
    verification: VerificationMachine<T, U, RL>,
    sessions: SessionIssuer<S>,
    users: U,
    dispatcher: D,
    config: AuthConfig,
}

impl<T, U, S, H, D, RL> AccountService<T, U, S, H, D, RL>
where
    T: TokenStore + Clone,
    U: UserRepository + Clone,
    S: SessionStore + Clone,
    H: PasswordHasher + Clone,
    D: MessageDispatcher + Clone,
    RL: RateLimiter + Clone,
{
    /// Build the service from its environment.
    #[must_use]
    pub fn new(env: AuthEnvironment<T, U, S, H, D, RL>) -> Self {
        let AuthEnvironment {
            tokens,
            users,
            sessions,
            hasher,
            dispatcher,
            rate_limiter,
            config,
        } = env;

        Self {
            tokens: TokenIssuer::new(tokens.clone(), &config),
            credentials: CredentialVerifier::new(
                users.clone(),
                hasher,
                config.min_password_length,
            ),
            verification: VerificationMachine::new(tokens, users.clone(), rate_limiter, &config),
            sessions: SessionIssuer::new(sessions, config.session_duration),
            users,
            dispatcher,
            config,
        }
    }

    /// Service configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a user and send a verification token.
    ///
    /// The token goes to the email channel, or to the phone when no email
    /// was supplied.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] for missing names, a short password, no
    ///   channel, or a malformed channel
    /// - [`AuthError::EmailTaken`] / [`AuthError::PhoneTaken`], checked in that order
    /// - [`AuthError::DispatchFailed`] if the token could not be stored or
    ///   sent (the user stays persisted)
    #[tracing::instrument(skip(self, request))]
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupOutcome> {
        let first_name = required_name("firstName", &request.first_name)?;
        let last_name = required_name("lastName", &request.last_name)?;
        let email = request
            .email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .map(Channel::email)
            .transpose()?;
        let phone = phone_from_parts(
            request.phone_country_code.as_deref(),
            request.phone.as_deref(),
        )?;
        if email.is_none() && phone.is_none() {
            return Err(AuthError::Validation(
                "email or phone - at least one is required".to_string(),
            ));
        }
        self.credentials.validate_password(&request.password)?;

        if let Some(channel) = &email {
            if self.users.find_by_channel(channel).await?.is_some() {
                return Err(AuthError::EmailTaken);
            }
        }
        if let Some(phone) = &phone {
            if self.users.find_by_phone(phone).await?.is_some() {
                return Err(AuthError::PhoneTaken);
            }
        }

        let mut user = User::new(first_name, last_name);
        user.email = email.as_ref().map(Channel::channel_id);
        user.phone = phone;
        user.password_hash = Some(self.credentials.hash_password(&request.password).await?);
        let user = self.users.create_user(&user).await?;

        tracing::info!(user_id = %user.user_id, "User signed up");

        let channel = email
            .or_else(|| user.channel(ChannelKind::Phone))
            .ok_or_else(|| AuthError::InternalError("User has no channel".to_string()))?;
        self.issue_and_deliver(&channel, None).await?;

        Ok(match channel.kind() {
            ChannelKind::Email => SignupOutcome::VerificationEmailSent {
                user_id: user.user_id,
            },
            ChannelKind::Phone => SignupOutcome::VerificationSmsSent {
                user_id: user.user_id,
            },
        })
    }

    /// Send a verification token to `channel` if a user owns it.
    ///
    /// Unknown channels get the same answer and nothing is sent.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DispatchFailed`] if the token could not be stored or sent
    /// - Repository errors
    #[tracing::instrument(skip(self, channel, redirect), fields(channel = channel.kind().as_str()))]
    pub async fn send_verification_token(
        &self,
        channel: &Channel,
        redirect: Option<&str>,
    ) -> Result<VerificationDispatch> {
        if self.users.find_by_channel(channel).await?.is_some() {
            self.issue_and_deliver(channel, redirect).await?;
        } else {
            tracing::debug!("No user owns channel, nothing sent");
        }

        Ok(VerificationDispatch {
            kind: channel.kind(),
        })
    }

    /// Log in with a password.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] for a malformed identifier
    /// - [`AuthError::InvalidCredentials`] for an unknown channel or a wrong password
    /// - [`AuthError::DispatchFailed`] if verification is required and the
    ///   new token could not be stored or sent
    #[tracing::instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let target = self
            .credentials
            .resolve_channel(&request.identifier, request.phone_country_code.as_deref())?;

        let user = match self.credentials.authenticate(&target, &request.password).await {
            Ok(user) => user,
            Err(e) => {
                if e == AuthError::InvalidCredentials {
                    metrics::counter!(metric_names::LOGIN, "outcome" => "invalid_credentials")
                        .increment(1);
                }
                return Err(e);
            }
        };

        if verification_required(&user, target.kind()) {
            self.issue_and_deliver(&target, None).await?;
            metrics::counter!(metric_names::LOGIN, "outcome" => "verification_required")
                .increment(1);
            tracing::info!(
                user_id = %user.user_id,
                channel = target.kind().as_str(),
                "Login requires verification"
            );
            return Ok(LoginOutcome::VerificationRequired { channel: target });
        }

        let session = self.sessions.establish(&user, LoginMethod::Password).await?;
        metrics::counter!(metric_names::LOGIN, "outcome" => "success").increment(1);

        Ok(LoginOutcome::Authenticated(session))
    }

    /// Redeem a verification link reference and log its owner in.
    ///
    /// `redirect` is the base64url-encoded `redirectUrl` that accompanied
    /// the link; undecodable values are dropped. The token is consumed
    /// whether or not a redirect is present.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenInvalidOrExpired`] for a malformed, unknown,
    ///   expired, superseded or already used reference
    /// - Store or repository errors
    #[tracing::instrument(skip(self, reference, redirect))]
    pub async fn redeem_token(&self, reference: &str, redirect: Option<&str>) -> Result<Redemption> {
        self.complete_redemption(&OpaqueReference::from_encoded(reference.to_string()), redirect)
            .await
    }

    /// Redeem an SMS code typed in by the user.
    ///
    /// # Errors
    ///
    /// Same as [`Self::redeem_token`].
    #[tracing::instrument(skip(self, channel, code, redirect), fields(channel = channel.kind().as_str()))]
    pub async fn redeem_code(
        &self,
        channel: &Channel,
        code: &str,
        redirect: Option<&str>,
    ) -> Result<Redemption> {
        let reference = OpaqueReference::encode(&channel.channel_id(), code.trim());
        self.complete_redemption(&reference, redirect).await
    }

    /// End a session. Logging out twice succeeds.
    ///
    /// # Errors
    ///
    /// Returns the session store's error.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, session_id: SessionId) -> Result<()> {
        self.sessions.tear_down(session_id).await
    }

    /// Resolve a session handle.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] for unknown or expired sessions.
    pub async fn authenticate(&self, session_id: SessionId) -> Result<Session> {
        self.sessions.authenticate(session_id).await
    }

    /// Read the caller's own profile.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] without a live session
    /// - [`AuthError::NotAuthorized`] if `target` is another user
    /// - [`AuthError::ResourceNotFound`] if the user no longer exists
    #[tracing::instrument(skip(self))]
    pub async fn current_user(
        &self,
        session_id: SessionId,
        target: ResourceTarget,
    ) -> Result<PublicProfile> {
        let session = self.sessions.authenticate(session_id).await?;
        let user_id = ensure_owner(&session, target)?;
        let user = self.users.get_user_by_id(user_id).await?;
        Ok(user.public_profile())
    }

    /// Update the caller's own profile.
    ///
    /// A changed email or phone loses its verified flag and is sent a new
    /// token once the user is persisted. Any live token for the replaced
    /// channel is deleted. Email links resume at the configured frontend
    /// location.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] / [`AuthError::NotAuthorized`]
    /// - [`AuthError::Validation`] for blank names or malformed channels
    /// - [`AuthError::EmailTaken`] / [`AuthError::PhoneTaken`]
    /// - [`AuthError::DispatchFailed`] if a token could not be stored or
    ///   sent (the update stays persisted)
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        session_id: SessionId,
        target: ResourceTarget,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdated> {
        let session = self.sessions.authenticate(session_id).await?;
        let user_id = ensure_owner(&session, target)?;
        let mut user = self.users.get_user_by_id(user_id).await?;

        if let Some(first_name) = &update.first_name {
            user.first_name = required_name("firstName", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = required_name("lastName", last_name)?;
        }
        if let Some(url) = update.profile_pic_url {
            user.profile_pic_url = Some(url).filter(|url| !url.trim().is_empty());
        }

        let mut changed = Vec::new();
        let mut replaced = Vec::new();

        if let Some(email) = &update.email {
            let channel = Channel::email(email)?;
            if !user.owns(&channel) {
                self.ensure_unclaimed(&channel, user.user_id).await?;
                replaced.extend(user.channel(ChannelKind::Email));
                user.email = Some(channel.channel_id());
                user.email_verified = false;
                changed.push(channel);
            }
        }

        if update.phone.is_some() || update.phone_country_code.is_some() {
            let country_code = update
                .phone_country_code
                .as_deref()
                .or_else(|| user.phone.as_ref().map(|p| p.country_code.as_str()));
            let number = update
                .phone
                .as_deref()
                .or_else(|| user.phone.as_ref().map(|p| p.number.as_str()));
            if let Some(phone) = phone_from_parts(country_code, number)? {
                let channel = Channel::Phone(phone.clone());
                if !user.owns(&channel) {
                    self.ensure_unclaimed(&channel, user.user_id).await?;
                    replaced.extend(user.channel(ChannelKind::Phone));
                    user.phone = Some(phone);
                    user.phone_verified = false;
                    changed.push(channel);
                }
            }
        }

        user.updated_at = Utc::now();
        let user = self.users.update_user(&user).await?;
        tracing::info!(
            user_id = %user.user_id,
            channels_changed = changed.len(),
            "Profile updated"
        );

        for channel in &replaced {
            self.tokens.revoke(channel).await?;
        }

        let mut verification_sent = Vec::with_capacity(changed.len());
        for channel in &changed {
            let redirect = match channel.kind() {
                ChannelKind::Email => Some(self.config.frontend_location.as_str()),
                ChannelKind::Phone => None,
            };
            self.issue_and_deliver(channel, redirect).await?;
            verification_sent.push(channel.kind());
        }

        Ok(ProfileUpdated {
            profile: user.public_profile(),
            verification_sent,
        })
    }

    async fn complete_redemption(
        &self,
        reference: &OpaqueReference,
        redirect: Option<&str>,
    ) -> Result<Redemption> {
        let verified = self.verification.redeem(reference).await?;
        let session = self
            .sessions
            .establish(&verified.user, LoginMethod::Token)
            .await?;
        metrics::counter!(metric_names::LOGIN, "outcome" => "token").increment(1);

        Ok(Redemption {
            session,
            channel: verified.channel,
            newly_verified: verified.newly_verified,
            redirect: redirect.and_then(decode_redirect),
        })
    }

    async fn ensure_unclaimed(&self, channel: &Channel, owner: UserId) -> Result<()> {
        match self.users.find_by_channel(channel).await? {
            Some(other) if other.user_id != owner => Err(match channel.kind() {
                ChannelKind::Email => AuthError::EmailTaken,
                ChannelKind::Phone => AuthError::PhoneTaken,
            }),
            _ => Ok(()),
        }
    }

    /// Issue a token for `channel` and send it. Any failure on the way is a
    /// dispatch failure; a stored token is not rolled back.
    async fn issue_and_deliver(
        &self,
        channel: &Channel,
        redirect: Option<&str>,
    ) -> Result<IssuedToken> {
        let purpose = TokenPurpose::for_kind(channel.kind());
        let issued = self
            .tokens
            .issue(channel, purpose, redirect)
            .await
            .map_err(|e| dispatch_failure(channel, e))?;

        let message = match channel.kind() {
            ChannelKind::Email => OutboundMessage::verification_email(
                channel.clone(),
                issued.link(&self.config.api_location),
            ),
            ChannelKind::Phone => {
                OutboundMessage::verification_sms(channel.clone(), issued.token.clone())
            }
        };

        self.dispatcher
            .send(message)
            .await
            .map_err(|e| dispatch_failure(channel, e))?;

        Ok(issued)
    }
}

fn dispatch_failure(channel: &Channel, error: AuthError) -> AuthError {
    metrics::counter!(metric_names::DISPATCH_FAILED).increment(1);
    tracing::error!(
        channel = channel.kind().as_str(),
        error = %error,
        "Verification message not delivered"
    );
    match error {
        AuthError::DispatchFailed(_) => error,
        other => AuthError::DispatchFailed(other.to_string()),
    }
}

fn required_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{field} - missing")));
    }
    Ok(value.to_string())
}

/// Both parts or neither; blank parts count as absent.
fn phone_from_parts(country_code: Option<&str>, number: Option<&str>) -> Result<Option<PhoneNumber>> {
    let country_code = country_code.filter(|s| !s.trim().is_empty());
    let number = number.filter(|s| !s.trim().is_empty());
    match (country_code, number) {
        (Some(country_code), Some(number)) => PhoneNumber::parse(country_code, number).map(Some),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(AuthError::Validation(
            "phoneCountryCode - required with a phone number".to_string(),
        )),
        (Some(_), None) => Err(AuthError::Validation(
            "phone - required with a country code".to_string(),
        )),
    }
}
