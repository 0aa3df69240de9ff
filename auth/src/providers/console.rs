//! Console dispatcher for development and SMS stand-in.

use crate::error::Result;
use crate::providers::{MessageDispatcher, OutboundMessage};
use tracing::info;

/// Console dispatcher.
///
/// This dispatcher logs messages instead of delivering them. Useful for
/// development, and as the SMS backend until a gateway is wired in.
///
/// # Examples
///
/// ```ignore
/// use account_auth::providers::{ConsoleDispatcher, MessageDispatcher, OutboundMessage};
///
/// let dispatcher = ConsoleDispatcher::new();
/// dispatcher.send(OutboundMessage::verification_sms(channel, "123456".into())).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleDispatcher;

impl ConsoleDispatcher {
    /// Create a new console dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MessageDispatcher for ConsoleDispatcher {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let body = message
            .variables
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            to = %message.destination,
            template = message.template.name(),
            "📨 Outbound message (Development Mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║ To: {:<57}║", message.destination.to_string());
        println!("║ Template: {:<51}║", message.template.name());
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ {body}");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        Ok(())
    }
}
