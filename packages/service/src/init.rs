//! Service initialization.

use std::sync::Arc;

use mail_core::Transport;
use mail_queue::MailQueue;
use mail_templates::TemplateResolver;
use mail_transport::{LogTransport, ResendTransport};

use crate::config::{ServiceConfig, TransportKind};
use crate::error::InitError;
use crate::service::MailService;

/// Build the transport selected by `config`.
pub fn build_transport(config: &ServiceConfig) -> Result<Arc<dyn Transport>, InitError> {
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Resend => Arc::new(ResendTransport::new(config.resend.clone())?),
        TransportKind::Log => {
            tracing::warn!("Using log transport, email will not be delivered");
            Arc::new(LogTransport::new())
        }
    };
    Ok(transport)
}

/// Start the mail queue and return a service bound to it.
///
/// This should be called once at startup; clone the returned service to share it.
pub async fn init_mail_service(
    config: ServiceConfig,
) -> Result<(MailService, tokio::task::JoinHandle<()>), InitError> {
    tracing::info!("Initializing mail service...");

    let transport = build_transport(&config)?;
    let (queue, handle) = MailQueue::start_shared(config.queue, transport).await?;
    let service = MailService::new(queue, TemplateResolver::new(config.branding));

    tracing::info!("Mail service initialized");
    Ok((service, handle))
}
