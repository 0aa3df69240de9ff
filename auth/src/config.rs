//! Authentication configuration.
//!
//! Values are provided by the application, either through the builders or
//! from environment variables via [`AuthConfig::from_env`] and
//! [`ConnectionSettings::from_env`].

use crate::error::{AuthError, Result};
use chrono::Duration;

/// Length and lifetime of one kind of verification token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Number of characters generated.
    pub length: usize,

    /// Time-to-live in the token store.
    pub ttl: Duration,
}

impl TokenPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(length: usize, ttl: Duration) -> Self {
        Self { length, ttl }
    }
}

/// Verification, login and session configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Public base URL of the API (e.g. "https://api.example.com").
    ///
    /// Verification links are formatted as
    /// `{api_location}/auth/login/{reference}[?redirectUrl={redirect}]`.
    pub api_location: String,

    /// Public base URL of the frontend.
    ///
    /// Used as the redirect target when a user changes a channel from
    /// their profile.
    pub frontend_location: String,

    /// Email link tokens. Default: 30 lowercase letters, 15 minutes.
    pub email_token: TokenPolicy,

    /// SMS codes. Default: 6 digits, 15 minutes.
    pub phone_code: TokenPolicy,

    /// Session lifetime. Default: 7 days.
    pub session_duration: Duration,

    /// Minimum accepted password length. Default: 6.
    pub min_password_length: usize,

    /// Redemption attempts allowed per channel within the window. Default: 5.
    ///
    /// Once exhausted, the channel's live token is deleted and further
    /// attempts are rejected until the window rolls over.
    pub redemption_attempts: u32,

    /// Sliding window for [`AuthConfig::redemption_attempts`]. Default: 15 minutes.
    pub redemption_window: std::time::Duration,
}

impl AuthConfig {
    /// Create configuration with default token policies.
    ///
    /// # Arguments
    ///
    /// * `api_location` - Base URL verification links point at
    /// * `frontend_location` - Base URL of the frontend application
    #[must_use]
    pub const fn new(api_location: String, frontend_location: String) -> Self {
        Self {
            api_location,
            frontend_location,
            email_token: TokenPolicy::new(30, Duration::minutes(15)),
            phone_code: TokenPolicy::new(6, Duration::minutes(15)),
            session_duration: Duration::days(7),
            min_password_length: 6,
            redemption_attempts: 5,
            redemption_window: std::time::Duration::from_secs(15 * 60),
        }
    }

    /// Set the email token policy.
    #[must_use]
    pub const fn with_email_token(mut self, policy: TokenPolicy) -> Self {
        self.email_token = policy;
        self
    }

    /// Set the SMS code policy.
    #[must_use]
    pub const fn with_phone_code(mut self, policy: TokenPolicy) -> Self {
        self.phone_code = policy;
        self
    }

    /// Set session duration.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set the minimum password length.
    #[must_use]
    pub const fn with_min_password_length(mut self, length: usize) -> Self {
        self.min_password_length = length;
        self
    }

    /// Set how many redemption attempts a channel gets per window.
    #[must_use]
    pub const fn with_redemption_limit(
        mut self,
        attempts: u32,
        window: std::time::Duration,
    ) -> Self {
        self.redemption_attempts = attempts;
        self.redemption_window = window;
        self
    }

    /// Load configuration from the process environment.
    ///
    /// | Variable | Required | Default |
    /// |---|---|---|
    /// | `API_LOCATION` | yes | |
    /// | `FRONTEND_LOCATION` | yes | |
    /// | `EMAIL_TOKEN_TTL_MINUTES` | no | 15 |
    /// | `PHONE_CODE_TTL_MINUTES` | no | 15 |
    /// | `SESSION_TTL_DAYS` | no | 7 |
    /// | `REDEMPTION_MAX_ATTEMPTS` | no | 5 |
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] naming the first missing or
    /// unparseable variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AuthConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_location = required(&lookup, "API_LOCATION")?;
        let frontend_location = required(&lookup, "FRONTEND_LOCATION")?;
        let mut config = Self::new(
            api_location.trim_end_matches('/').to_string(),
            frontend_location,
        );

        if let Some(minutes) = optional_i64(&lookup, "EMAIL_TOKEN_TTL_MINUTES")? {
            config.email_token.ttl = Duration::minutes(minutes);
        }
        if let Some(minutes) = optional_i64(&lookup, "PHONE_CODE_TTL_MINUTES")? {
            config.phone_code.ttl = Duration::minutes(minutes);
        }
        if let Some(days) = optional_i64(&lookup, "SESSION_TTL_DAYS")? {
            config.session_duration = Duration::days(days);
        }
        if let Some(attempts) = optional_i64(&lookup, "REDEMPTION_MAX_ATTEMPTS")? {
            config.redemption_attempts = u32::try_from(attempts).map_err(|_| {
                AuthError::Validation("REDEMPTION_MAX_ATTEMPTS - out of range".into())
            })?;
        }

        Ok(config)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(
            "http://localhost:3000".to_string(),
            "http://localhost:8080".to_string(),
        )
    }
}

/// Connection settings for the production adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Redis URL for the token and session stores.
    pub redis_url: String,

    /// Postgres URL for the user repository.
    pub database_url: String,

    /// SMTP relay settings.
    pub smtp: SmtpSettings,
}

/// SMTP relay settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// SMTP server host.
    pub host: String,

    /// SMTP server port.
    pub port: u16,

    /// SMTP username.
    pub username: String,

    /// SMTP password.
    pub password: String,

    /// Default sender address.
    pub from_address: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ConnectionSettings {
    /// Load connection settings from the process environment.
    ///
    /// Reads `REDIS_URL`, `DATABASE_URL`, `SMTP_HOST`, `SMTP_PORT`,
    /// `SMTP_USER`, `SMTP_PASSWORD` and `DEFAULT_MAIL_FROM_ADDRESS`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load connection settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionSettings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = required(&lookup, "SMTP_PORT")?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AuthError::Validation(format!("SMTP_PORT - not a port: {port:?}")))?;

        Ok(Self {
            redis_url: required(&lookup, "REDIS_URL")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            smtp: SmtpSettings {
                host: required(&lookup, "SMTP_HOST")?,
                port,
                username: required(&lookup, "SMTP_USER")?,
                password: required(&lookup, "SMTP_PASSWORD")?,
                from_address: required(&lookup, "DEFAULT_MAIL_FROM_ADDRESS")?,
            },
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AuthError::Validation(format!("No {key} in env")))
}

fn optional_i64<F>(lookup: &F, key: &str) -> Result<Option<i64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|parsed| *parsed > 0)
                .ok_or_else(|| AuthError::Validation(format!("{key} - expected a positive integer")))
        })
        .transpose()
}
