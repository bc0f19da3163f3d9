//! Transport implementations for the mail queue.
//!
//! - `ResendTransport` - Delivers through a Resend-compatible HTTP API
//! - `LogTransport` - Logs messages instead of sending them, for development

mod log_transport;
mod resend;

pub use log_transport::LogTransport;
pub use resend::{ResendConfig, ResendTransport, TransportBuildError};
