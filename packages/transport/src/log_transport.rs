//! Development transport that only logs.

use mail_core::{DeliveryId, EmailMessage, Recipients, Transport, TransportFuture};
use ulid::Ulid;

/// Accepts every message and logs it instead of delivering.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, recipients: &Recipients, message: &EmailMessage) -> TransportFuture {
        let id = DeliveryId::new(format!("log-{}", Ulid::new()));
        tracing::info!(
            "[log transport] {} -> {}: {} ({} bytes html, {} bytes text)",
            id,
            recipients,
            message.subject,
            message.html.len(),
            message.text.len()
        );
        Box::pin(async move { Ok(id) })
    }
}
