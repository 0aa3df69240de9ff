//! Token issuance and opaque references.
//!
//! A verification link carries `base64url("{channel_id}::{token}")` as its
//! path segment and, separately, a base64url-encoded redirect target as the
//! `redirectUrl` query parameter. SMS codes are typed back by the user and
//! turned into the same reference shape with [`OpaqueReference::encode`].

use crate::channel::Channel;
use crate::config::{AuthConfig, TokenPolicy};
use crate::constants::metric_names;
use crate::error::{AuthError, Result};
use crate::providers::{TokenData, TokenPurpose, TokenStore};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;

/// Separator between channel identifier and token inside a reference.
const SEPARATOR: &str = "::";

/// Generate a random token of `length` characters drawn from `purpose`'s alphabet.
#[must_use]
pub fn generate_token(purpose: TokenPurpose, length: usize) -> String {
    let alphabet = purpose.alphabet();
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}

/// Encoded `channel_id::token` bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueReference(String);

impl OpaqueReference {
    /// Encode a channel identifier and token.
    #[must_use]
    pub fn encode(channel_id: &str, token: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(format!("{channel_id}{SEPARATOR}{token}")))
    }

    /// Wrap a reference received from a client.
    #[must_use]
    pub const fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    /// The encoded form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the reference back into `(channel_id, token)`.
    ///
    /// Standard (padded) base64 is accepted as well as base64url.
    ///
    /// # Errors
    ///
    /// Any malformed reference is [`AuthError::TokenInvalidOrExpired`]; callers
    /// learn nothing more specific than a wrong token would tell them.
    pub fn decode(&self) -> Result<(String, String)> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.trim())
            .or_else(|_| STANDARD.decode(self.0.trim()))
            .map_err(|_| AuthError::TokenInvalidOrExpired)?;
        let decoded = String::from_utf8(bytes).map_err(|_| AuthError::TokenInvalidOrExpired)?;

        let (channel_id, token) = decoded
            .rsplit_once(SEPARATOR)
            .ok_or(AuthError::TokenInvalidOrExpired)?;
        if channel_id.is_empty() || token.is_empty() {
            return Err(AuthError::TokenInvalidOrExpired);
        }

        Ok((channel_id.to_string(), token.to_string()))
    }
}

impl fmt::Display for OpaqueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a redirect target for the `redirectUrl` query parameter.
#[must_use]
pub fn encode_redirect(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url)
}

/// Decode a `redirectUrl` query parameter.
///
/// Returns `None` for anything that does not decode to UTF-8 text.
#[must_use]
pub fn decode_redirect(encoded: &str) -> Option<String> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return None;
    }
    URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD.decode(encoded))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// A freshly stored token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Channel the token was issued for.
    pub channel: Channel,

    /// Raw token value, delivered out of band.
    pub token: String,

    /// Redeemable reference.
    pub reference: OpaqueReference,

    /// Encoded redirect hint, if one was supplied.
    pub redirect: Option<String>,

    /// Expiry of the stored token.
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Verification link: `{api_location}/auth/login/{reference}[?redirectUrl={redirect}]`.
    #[must_use]
    pub fn link(&self, api_location: &str) -> String {
        let mut link = format!(
            "{}/auth/login/{}",
            api_location.trim_end_matches('/'),
            self.reference
        );
        if let Some(redirect) = &self.redirect {
            link.push_str("?redirectUrl=");
            link.push_str(redirect);
        }
        link
    }
}

/// Token Issuer.
///
/// Generates a token, writes it to the token store (overwriting any live
/// token for the channel) and builds the reference.
#[derive(Clone, Debug)]
pub struct TokenIssuer<T> {
    store: T,
    email_token: TokenPolicy,
    phone_code: TokenPolicy,
}

impl<T: TokenStore> TokenIssuer<T> {
    /// Create an issuer over a token store.
    #[must_use]
    pub const fn new(store: T, config: &AuthConfig) -> Self {
        Self {
            store,
            email_token: config.email_token,
            phone_code: config.phone_code,
        }
    }

    const fn policy(&self, purpose: TokenPurpose) -> TokenPolicy {
        match purpose {
            TokenPurpose::EmailVerification => self.email_token,
            TokenPurpose::PhoneVerification => self.phone_code,
        }
    }

    /// Issue a token for `channel`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails; nothing is stored and
    /// the caller must not send a notification.
    pub async fn issue(
        &self,
        channel: &Channel,
        purpose: TokenPurpose,
        redirect_hint: Option<&str>,
    ) -> Result<IssuedToken> {
        let policy = self.policy(purpose);
        let token = generate_token(purpose, policy.length);
        let channel_id = channel.channel_id();
        let expires_at = Utc::now() + policy.ttl;

        self.store
            .store_token(
                &channel_id,
                TokenData::new(purpose, token.clone(), channel.clone(), expires_at),
            )
            .await?;

        metrics::counter!(metric_names::TOKENS_ISSUED, "purpose" => purpose.as_str()).increment(1);
        tracing::info!(
            channel = channel.kind().as_str(),
            purpose = purpose.as_str(),
            expires_at = %expires_at,
            "Issued verification token"
        );

        Ok(IssuedToken {
            channel: channel.clone(),
            reference: OpaqueReference::encode(&channel_id, &token),
            token,
            redirect: redirect_hint
                .filter(|hint| !hint.is_empty())
                .map(encode_redirect),
            expires_at,
        })
    }

    /// Delete any live token for `channel`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the delete fails.
    pub async fn revoke(&self, channel: &Channel) -> Result<()> {
        self.store.delete_token(&channel.channel_id()).await?;
        tracing::info!(channel = channel.kind().as_str(), "Revoked verification token");
        Ok(())
    }
}
