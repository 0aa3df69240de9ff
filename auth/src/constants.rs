//! Authentication constants.

/// Success message codes returned to the HTTP layer.
pub mod messages {
    /// Signup (or a channel change) sent a verification email.
    pub const VERIFICATION_EMAIL_SENT: &str = "VERIFICATION_EMAIL_SENT";

    /// Signup (or a channel change) sent a verification SMS.
    pub const VERIFICATION_SMS_SENT: &str = "VERIFICATION_SMS_SENT";

    /// A session was established.
    pub const LOGIN_SUCCESSFUL: &str = "LOGIN_SUCCESSFUL";

    /// A verification email was sent if the address belongs to a user.
    pub const EMAIL_MAYBE_SENT: &str = "EMAIL_MAYBE_SENT";

    /// A verification SMS was sent if the number belongs to a user.
    pub const SMS_MAYBE_SENT: &str = "SMS_MAYBE_SENT";

    /// The session was torn down.
    pub const LOGOUT_SUCCESSFUL: &str = "LOGOUT_SUCCESSFUL";

    /// The profile was updated.
    pub const UPDATE_SUCCESSFUL: &str = "UPDATE_SUCCESSFUL";
}

/// Metric names.
pub mod metric_names {
    /// Tokens written to the store, labelled by `purpose`.
    pub const TOKENS_ISSUED: &str = "auth.tokens.issued";

    /// Tokens successfully redeemed.
    pub const TOKENS_REDEEMED: &str = "auth.tokens.redeemed";

    /// Redemption attempts rejected as invalid or expired.
    pub const TOKENS_REJECTED: &str = "auth.tokens.rejected";

    /// Login attempts, labelled by `outcome`.
    pub const LOGIN: &str = "auth.login";

    /// Messages the dispatcher failed to deliver.
    pub const DISPATCH_FAILED: &str = "auth.dispatch.failed";
}
