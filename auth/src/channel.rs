//! Contact channels.
//!
//! A user is reachable through at most one email address and at most one
//! `(country code, phone)` pair. Each channel is verified independently.
//!
//! Login input arrives as a single identifier field plus an optional country
//! code; [`resolve_identifier`] turns it into a [`LoginTarget`] once, and
//! everything downstream matches on the variant instead of re-inspecting
//! strings.

use crate::error::{AuthError, Result};
use crate::utils::{
    is_valid_country_code, is_valid_email, is_valid_phone_digits, normalize_email, phone_digits,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A phone number split into country calling code and national digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// Country calling code including the leading `+` (e.g. `+91`).
    pub country_code: String,

    /// National number, digits only.
    pub number: String,
}

impl PhoneNumber {
    /// Build a phone number, normalizing the national part to digits.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the country code or number is malformed.
    pub fn parse(country_code: &str, number: &str) -> Result<Self> {
        let country_code = country_code.trim();
        if !is_valid_country_code(country_code) {
            return Err(AuthError::Validation(format!(
                "phoneCountryCode - invalid country code {country_code:?}"
            )));
        }

        let digits = phone_digits(number);
        if !is_valid_phone_digits(&digits) {
            return Err(AuthError::Validation(
                "phone - must contain 4 to 15 digits".to_string(),
            ));
        }

        Ok(Self {
            country_code: country_code.to_string(),
            number: digits,
        })
    }

    /// Full number as used for token keys and SMS delivery (`+911111111111`).
    #[must_use]
    pub fn full(&self) -> String {
        format!("{}{}", self.country_code, self.number)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.country_code, self.number)
    }
}

/// Kind of contact channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Email address.
    Email,

    /// Phone number (SMS).
    Phone,
}

impl ChannelKind {
    /// Stable lowercase label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// A concrete contact channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Email address (normalized to lowercase).
    Email(String),

    /// Phone number.
    Phone(PhoneNumber),
}

/// The channel a login attempt targets.
pub type LoginTarget = Channel;

impl Channel {
    /// Build an email channel after validating the address.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the address is malformed.
    pub fn email(address: &str) -> Result<Self> {
        let address = normalize_email(address);
        if !is_valid_email(&address) {
            return Err(AuthError::Validation("email - invalid value".to_string()));
        }
        Ok(Self::Email(address))
    }

    /// Build a phone channel.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the country code or number is malformed.
    pub fn phone(country_code: &str, number: &str) -> Result<Self> {
        PhoneNumber::parse(country_code, number).map(Self::Phone)
    }

    /// Identifier keying this channel's verification token.
    ///
    /// The email string, or the concatenation of country code and number.
    #[must_use]
    pub fn channel_id(&self) -> String {
        match self {
            Self::Email(address) => address.clone(),
            Self::Phone(phone) => phone.full(),
        }
    }

    /// Kind of this channel.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        match self {
            Self::Email(_) => ChannelKind::Email,
            Self::Phone(_) => ChannelKind::Phone,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(address) => f.write_str(address),
            Self::Phone(phone) => phone.fmt(f),
        }
    }
}

/// Classify a combined login identifier as an email or a phone number.
///
/// Identifiers containing `@` are treated as email addresses; everything
/// else is a phone number and requires `country_code`.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] for unparseable input, or a phone
/// number supplied without a country code.
///
/// # Examples
///
/// ```
/// use account_auth::channel::{resolve_identifier, Channel, ChannelKind};
///
/// let target = resolve_identifier(" A@X.com ", None).unwrap();
/// assert_eq!(target, Channel::Email("a@x.com".to_string()));
///
/// let target = resolve_identifier("111-111-1111", Some("+91")).unwrap();
/// assert_eq!(target.kind(), ChannelKind::Phone);
/// assert_eq!(target.channel_id(), "+911111111111");
/// ```
pub fn resolve_identifier(identifier: &str, country_code: Option<&str>) -> Result<LoginTarget> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(AuthError::Validation("identifier - missing".to_string()));
    }

    if identifier.contains('@') {
        return Channel::email(identifier);
    }

    let Some(country_code) = country_code.filter(|code| !code.trim().is_empty()) else {
        return Err(AuthError::Validation(
            "phoneCountryCode - required with a phone number".to_string(),
        ));
    };

    Channel::phone(country_code, identifier)
}
