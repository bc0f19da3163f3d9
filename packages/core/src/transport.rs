//! The delivery capability the queue dispatches through.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{EmailMessage, Recipients};

/// Identifier a transport returns for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether retrying a failed send could succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network errors, rate limits, provider outages.
    Transient,
    /// Rejected payloads such as malformed addresses.
    Permanent,
}

/// A failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?} delivery failure: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FailureKind::Permanent
    }
}

/// Result type for transports.
pub type TransportResult = Result<DeliveryId, TransportError>;

/// Future type for async sends.
pub type TransportFuture = Pin<Box<dyn Future<Output = TransportResult> + Send>>;

/// Trait for email transports.
///
/// Implementations own their timeouts; the queue never cancels a send.
pub trait Transport: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Attempt delivery of `message` to `recipients`.
    fn send(&self, recipients: &Recipients, message: &EmailMessage) -> TransportFuture;
}

/// A simple function-based transport.
pub struct FnTransport<F>
where
    F: Fn(&Recipients, &EmailMessage) -> TransportFuture + Send + Sync + 'static,
{
    name: String,
    send: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&Recipients, &EmailMessage) -> TransportFuture + Send + Sync + 'static,
{
    /// Create a new function-based transport.
    pub fn new(name: impl Into<String>, send: F) -> Self {
        Self {
            name: name.into(),
            send,
        }
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(&Recipients, &EmailMessage) -> TransportFuture + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, recipients: &Recipients, message: &EmailMessage) -> TransportFuture {
        (self.send)(recipients, message)
    }
}
