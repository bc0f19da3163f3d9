//! Resend HTTP API transport (https://resend.com/docs/api-reference/emails/send-email).

use std::sync::Arc;
use std::time::Duration;

use mail_core::{
    DeliveryId, EmailMessage, Recipients, Transport, TransportError, TransportFuture,
    TransportResult,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for the Resend transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResendConfig {
    pub api_key: String,
    /// Sender, e.g. `Shop <orders@shop.example>`.
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from: String::new(),
            reply_to: None,
            endpoint: "https://api.resend.com/emails".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Errors building a transport from configuration.
#[derive(Debug, thiserror::Error)]
pub enum TransportBuildError {
    #[error("Resend API key not configured")]
    MissingApiKey,

    #[error("Sender address not configured")]
    MissingSender,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Delivers messages through the Resend API.
#[derive(Debug, Clone)]
pub struct ResendTransport {
    client: reqwest::Client,
    config: Arc<ResendConfig>,
}

impl ResendTransport {
    pub fn new(config: ResendConfig) -> Result<Self, TransportBuildError> {
        if config.api_key.is_empty() {
            return Err(TransportBuildError::MissingApiKey);
        }
        if config.from.is_empty() {
            return Err(TransportBuildError::MissingSender);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

impl Transport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    fn send(&self, recipients: &Recipients, message: &EmailMessage) -> TransportFuture {
        let payload = build_payload(&self.config, recipients, message);
        let client = self.client.clone();
        let config = self.config.clone();

        Box::pin(deliver(client, config, payload))
    }
}

async fn deliver(
    client: reqwest::Client,
    config: Arc<ResendConfig>,
    payload: serde_json::Value,
) -> TransportResult {
    let resp = client
        .post(&config.endpoint)
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| TransportError::transient(format!("Resend request failed: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(classify_failure(status, &text));
    }

    let body: SendResponse = resp
        .json()
        .await
        .map_err(|e| TransportError::transient(format!("Unreadable Resend response: {}", e)))?;
    Ok(DeliveryId::new(body.id))
}

/// Request body for one message.
fn build_payload(
    config: &ResendConfig,
    recipients: &Recipients,
    message: &EmailMessage,
) -> serde_json::Value {
    let mut payload = json!({
        "from": config.from,
        "to": recipients.as_slice(),
        "subject": message.subject,
        "html": message.html,
        "text": message.text,
    });
    if let Some(reply_to) = &config.reply_to {
        payload["reply_to"] = json!(reply_to);
    }
    payload
}

/// 4xx responses other than 408 and 429 are permanent.
fn classify_failure(status: StatusCode, body: &str) -> TransportError {
    let message = format!("Resend returned {}: {}", status, body);
    if status.is_client_error()
        && status != StatusCode::TOO_MANY_REQUESTS
        && status != StatusCode::REQUEST_TIMEOUT
    {
        TransportError::permanent(message)
    } else {
        TransportError::transient(message)
    }
}
