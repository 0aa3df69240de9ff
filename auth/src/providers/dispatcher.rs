//! Message dispatcher trait.
//!
//! The core decides *what* to send (a template kind plus variables); the
//! dispatcher decides how it is rendered and delivered.

use crate::channel::Channel;
use crate::error::Result;
use std::collections::BTreeMap;

/// Template used for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Email carrying a verification link. Variables: `link`.
    EmailVerification,

    /// SMS carrying a numeric code. Variables: `code`.
    PhoneVerification,
}

impl TemplateKind {
    /// Template name as known to renderers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmailVerification => "email-verification",
            Self::PhoneVerification => "phone-verification",
        }
    }
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Where the message goes.
    pub destination: Channel,

    /// Template to render.
    pub template: TemplateKind,

    /// Template variables.
    pub variables: BTreeMap<String, String>,
}

impl OutboundMessage {
    /// Verification email carrying `link`.
    #[must_use]
    pub fn verification_email(destination: Channel, link: String) -> Self {
        Self {
            destination,
            template: TemplateKind::EmailVerification,
            variables: BTreeMap::from([("link".to_string(), link)]),
        }
    }

    /// Verification SMS carrying `code`.
    #[must_use]
    pub fn verification_sms(destination: Channel, code: String) -> Self {
        Self {
            destination,
            template: TemplateKind::PhoneVerification,
            variables: BTreeMap::from([("code".to_string(), code)]),
        }
    }

    /// Template variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

/// Message dispatcher (email / SMS).
///
/// Delivery is fire-and-forget from the core's perspective: a failure is
/// reported to the caller but never rolls back the stored token.
pub trait MessageDispatcher: Send + Sync {
    /// Deliver a message.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DispatchFailed` if delivery fails.
    fn send(
        &self,
        message: OutboundMessage,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Routes email messages to one dispatcher and SMS messages to another.
#[derive(Clone, Debug)]
pub struct ChannelRouter<E, S> {
    email: E,
    sms: S,
}

impl<E, S> ChannelRouter<E, S> {
    /// Create a router.
    #[must_use]
    pub const fn new(email: E, sms: S) -> Self {
        Self { email, sms }
    }
}

impl<E, S> MessageDispatcher for ChannelRouter<E, S>
where
    E: MessageDispatcher,
    S: MessageDispatcher,
{
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        match message.destination {
            Channel::Email(_) => self.email.send(message).await,
            Channel::Phone(_) => self.sms.send(message).await,
        }
    }
}
