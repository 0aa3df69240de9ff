//! SMTP email dispatcher implementation using Lettre.

use crate::channel::Channel;
use crate::config::SmtpSettings;
use crate::error::{AuthError, Result};
use crate::providers::{MessageDispatcher, OutboundMessage, TemplateKind};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP email dispatcher using Lettre.
///
/// Renders the verification email and sends it over SMTP. Only email
/// destinations are accepted; pair it with an SMS dispatcher through
/// [`ChannelRouter`](crate::providers::ChannelRouter).
///
/// # Examples
///
/// ```ignore
/// use account_auth::config::ConnectionSettings;
/// use account_auth::providers::SmtpEmailDispatcher;
///
/// let settings = ConnectionSettings::from_env()?;
/// let dispatcher = SmtpEmailDispatcher::new(&settings.smtp);
/// ```
#[derive(Clone)]
pub struct SmtpEmailDispatcher {
    /// SMTP server address.
    smtp_server: String,

    /// SMTP server port.
    smtp_port: u16,

    /// SMTP credentials.
    credentials: Credentials,

    /// Sender address.
    from_address: String,
}

impl SmtpEmailDispatcher {
    /// Create a new SMTP dispatcher from relay settings.
    #[must_use]
    pub fn new(settings: &SmtpSettings) -> Self {
        Self {
            smtp_server: settings.host.clone(),
            smtp_port: settings.port,
            credentials: Credentials::new(settings.username.clone(), settings.password.clone()),
            from_address: settings.from_address.clone(),
        }
    }

    /// Build SMTP transport for sending emails.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        Ok(AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_server)
            .map_err(|e| AuthError::DispatchFailed(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }
}

/// Subject and HTML body for a template.
fn render(message: &OutboundMessage) -> Result<(&'static str, String)> {
    match message.template {
        TemplateKind::EmailVerification => {
            let link = message.variable("link").ok_or_else(|| {
                AuthError::DispatchFailed("email-verification requires a link".to_string())
            })?;

            let html_body = format!(
                r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Verify your email address</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Verify your email address</h2>
        <p>Click the link below to verify your email address and sign in.</p>
        <p style="margin: 30px 0;">
            <a href="{link}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Verify Email
            </a>
        </p>
        <p style="color: #666; font-size: 14px;">
            If you didn't request this email, you can safely ignore it.
        </p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Or copy and paste this link into your browser:<br>
            {link}
        </p>
    </div>
</body>
</html>
            "#
            );

            Ok(("Verify your email address", html_body))
        }
        TemplateKind::PhoneVerification => Err(AuthError::DispatchFailed(
            "SMTP dispatcher cannot deliver SMS templates".to_string(),
        )),
    }
}

impl MessageDispatcher for SmtpEmailDispatcher {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let Channel::Email(to) = &message.destination else {
            return Err(AuthError::DispatchFailed(
                "SMTP dispatcher only delivers to email addresses".to_string(),
            ));
        };
        let (subject, html_body) = render(&message)?;

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| AuthError::DispatchFailed(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::DispatchFailed(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| AuthError::DispatchFailed(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        mailer
            .send(email)
            .await
            .map_err(|e| AuthError::DispatchFailed(format!("Failed to send email: {e}")))?;

        tracing::info!(template = message.template.name(), "Sent email over SMTP");

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dispatcher() -> SmtpEmailDispatcher {
        SmtpEmailDispatcher::new(&SmtpSettings {
            host: "localhost".into(),
            port: 2525,
            username: "user".into(),
            password: "pass".into(),
            from_address: "noreply@example.com".into(),
        })
    }

    #[test]
    fn test_render_embeds_link() {
        let message = OutboundMessage::verification_email(
            Channel::Email("a@x.com".into()),
            "https://api.example.com/auth/login/abc".into(),
        );
        let (subject, body) = render(&message).unwrap();
        assert_eq!(subject, "Verify your email address");
        assert!(body.contains("https://api.example.com/auth/login/abc"));
    }

    #[tokio::test]
    async fn test_rejects_phone_destination() {
        let message = OutboundMessage::verification_sms(
            Channel::phone("+91", "1111111111").unwrap(),
            "123456".into(),
        );
        let err = dispatcher().send(message).await.unwrap_err();
        assert!(matches!(err, AuthError::DispatchFailed(_)));
    }
}
