//! Mail service wiring for the storefront.
//!
//! This crate ties the pieces together:
//! - Configuration from environment variables
//! - Transport selection and queue startup
//! - `MailService`, which renders events and submits them to the queue

mod config;
mod error;
mod init;
mod service;

pub use config::{ServiceConfig, TransportKind};
pub use error::{ConfigError, InitError};
pub use init::{build_transport, init_mail_service};
pub use service::MailService;
