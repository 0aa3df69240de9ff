//! Error types for verification, login and session operations.

use thiserror::Error;

/// Result type alias for account authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the account authentication core.
///
/// Credential and token failures are deliberately information-minimal:
/// every root cause collapses into [`AuthError::InvalidCredentials`] or
/// [`AuthError::TokenInvalidOrExpired`] so callers cannot enumerate users
/// or channels. Conflicts at signup are the only user-facing errors that
/// name what went wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or missing input.
    #[error("Invalid input: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Credential Errors
    // ═══════════════════════════════════════════════════════════

    /// No matching user, or password mismatch.
    #[error("Invalid credentials")]
    InvalidCredentials,

    // ═══════════════════════════════════════════════════════════
    // Token Errors
    // ═══════════════════════════════════════════════════════════

    /// Token missing, expired, mismatched, already consumed, or its user vanished.
    #[error("Token invalid or expired")]
    TokenInvalidOrExpired,

    /// Too many redemption attempts for one channel.
    ///
    /// Reported to clients as [`AuthError::TokenInvalidOrExpired`].
    #[error("Too many attempts, please retry after {retry_after:?}")]
    TooManyAttempts {
        /// Duration to wait before retrying
        retry_after: std::time::Duration,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflict Errors
    // ═══════════════════════════════════════════════════════════

    /// Email already claimed by another user.
    #[error("Email already taken")]
    EmailTaken,

    /// Phone number already claimed by another user.
    #[error("Phone number already taken")]
    PhoneTaken,

    // ═══════════════════════════════════════════════════════════
    // Session / Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// No authenticated session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Authenticated caller may not act on the target resource.
    #[error("Not authorized")]
    NotAuthorized,

    /// Session not found.
    #[error("Session not found")]
    SessionNotFound,

    /// Session has expired.
    #[error("Session has expired")]
    SessionExpired,

    /// Requested resource not found.
    #[error("Resource not found")]
    ResourceNotFound,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Message dispatcher failed (the token was still stored).
    #[error("Message dispatch failed: {0}")]
    DispatchFailed(String),

    /// Cache (token / session store) operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal server error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse error category, as reported to the surrounding HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Unknown user or wrong password.
    Credential,
    /// Unusable verification token.
    Token,
    /// Email or phone already claimed.
    Conflict,
    /// Message dispatcher failure.
    Dispatch,
    /// Missing, expired or foreign session.
    Session,
    /// Storage or other server-side failure.
    Internal,
}

impl AuthError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidCredentials => ErrorKind::Credential,
            Self::TokenInvalidOrExpired | Self::TooManyAttempts { .. } => ErrorKind::Token,
            Self::EmailTaken | Self::PhoneTaken => ErrorKind::Conflict,
            Self::DispatchFailed(_) => ErrorKind::Dispatch,
            Self::NotAuthenticated
            | Self::NotAuthorized
            | Self::SessionNotFound
            | Self::SessionExpired => ErrorKind::Session,
            Self::ResourceNotFound
            | Self::CacheError(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Wire code reported to clients.
    ///
    /// # Examples
    ///
    /// ```
    /// # use account_auth::AuthError;
    /// assert_eq!(AuthError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
    /// assert_eq!(AuthError::CacheError("down".into()).code(), "SERVER_ERROR");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_DATA",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenInvalidOrExpired | Self::TooManyAttempts { .. } => {
                "TOKEN_INVALID_OR_EXPIRED"
            }
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::PhoneTaken => "PHONE_TAKEN",
            Self::NotAuthenticated | Self::SessionNotFound | Self::SessionExpired => {
                "NOT_AUTHENTICATED"
            }
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::DispatchFailed(_)
            | Self::ResourceNotFound
            | Self::CacheError(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => "SERVER_ERROR",
        }
    }

    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use account_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::InternalError("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::Credential
                | ErrorKind::Token
                | ErrorKind::Conflict
                | ErrorKind::Session
        )
    }

    /// Returns `true` if this error should be surfaced as a server error.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Dispatch | ErrorKind::Internal)
    }
}
