//! Service error types.

use mail_queue::MailQueueError;
use mail_transport::TransportBuildError;

/// Errors reading service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown mail transport: {0}")]
    UnknownTransport(String),
}

/// Errors starting the mail service.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportBuildError),

    #[error("Queue error: {0}")]
    Queue(#[from] MailQueueError),
}
