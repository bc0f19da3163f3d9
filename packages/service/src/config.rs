//! Environment-driven service configuration.

use mail_core::QueueConfig;
use mail_templates::StoreBranding;
use mail_transport::ResendConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which transport delivers queued email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Resend,
    Log,
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resend" => Ok(TransportKind::Resend),
            "log" => Ok(TransportKind::Log),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

/// Everything needed to start the mail service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub transport: TransportKind,
    pub resend: ResendConfig,
    pub queue: QueueConfig,
    pub branding: StoreBranding,
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    ///
    /// `MAIL_TRANSPORT` defaults to `resend` when `RESEND_API_KEY` is set and
    /// to `log` otherwise.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut resend = ResendConfig::default();
        if let Some(api_key) = get("RESEND_API_KEY") {
            resend.api_key = api_key;
        }
        if let Some(from) = get("MAIL_FROM") {
            resend.from = from;
        }
        resend.reply_to = get("MAIL_REPLY_TO");
        if let Some(endpoint) = get("RESEND_ENDPOINT") {
            resend.endpoint = endpoint;
        }
        if let Some(value) = get("RESEND_TIMEOUT_SECS") {
            resend.timeout_secs = parse_number("RESEND_TIMEOUT_SECS", &value)?;
        }

        let transport = match get("MAIL_TRANSPORT") {
            Some(kind) => kind.parse()?,
            None if !resend.api_key.is_empty() => TransportKind::Resend,
            None => TransportKind::Log,
        };

        let mut queue = QueueConfig::default();
        if let Some(value) = get("MAIL_MAX_RETRIES") {
            queue.max_retries = parse_number("MAIL_MAX_RETRIES", &value)?;
        }
        if let Some(value) = get("MAIL_RETRY_DELAY_MS") {
            queue.retry_delay_ms = parse_number("MAIL_RETRY_DELAY_MS", &value)?;
        }
        if let Some(value) = get("MAIL_BATCH_SIZE") {
            queue.batch_size = parse_number("MAIL_BATCH_SIZE", &value)?;
        }
        if let Some(value) = get("MAIL_DROP_PERMANENT_FAILURES") {
            queue.drop_permanent_failures = parse_flag("MAIL_DROP_PERMANENT_FAILURES", &value)?;
        }

        let mut branding = StoreBranding::default();
        if let Some(name) = get("STORE_NAME") {
            branding.store_name = name;
        }
        if let Some(url) = get("STORE_URL") {
            branding.store_url = url;
        }
        if let Some(email) = get("SUPPORT_EMAIL") {
            branding.support_email = email;
        }

        Ok(Self {
            transport,
            resend,
            queue,
            branding,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
