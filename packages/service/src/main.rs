//! Send a single storefront email through the queue and wait for the outcome.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use mail_core::{MailEvent, Priority, Recipients};
use mail_service::{ServiceConfig, init_mail_service};
use mail_templates::EmailEvent;
use tracing_subscriber::EnvFilter;

/// Render a storefront event and deliver it through the mail queue
#[derive(Parser, Debug)]
#[command(name = "mailer")]
#[command(about = "Send a storefront email through the mail queue", long_about = None)]
#[command(version)]
struct Cli {
    /// Comma-separated recipient addresses
    #[arg(value_delimiter = ',', required = true)]
    recipients: Vec<String>,

    /// Event as JSON, e.g. '{"kind":"welcome","customer_name":"Ada"}'
    event: String,

    /// Override the event's default priority
    #[arg(short, long, value_enum)]
    priority: Option<PriorityArg>,

    /// Earliest send time (RFC 3339)
    #[arg(long)]
    not_before: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PriorityArg {
    High,
    Normal,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::High => Priority::High,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the email was delivered.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let recipients = Recipients::new(
        cli.recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
    );
    if recipients.is_empty() {
        return Err("no recipient addresses given".into());
    }
    let event: EmailEvent = serde_json::from_str(&cli.event)?;
    let priority = cli
        .priority
        .map(Priority::from)
        .unwrap_or_else(|| event.default_priority());

    let config = ServiceConfig::from_env()?;
    let (service, handle) = init_mail_service(config).await?;

    let mut events = service.queue().subscribe();
    let job_id = service.send_event_with(recipients, &event, priority, cli.not_before)?;
    tracing::info!("Submitted {} email as job {} ({})", event.kind(), job_id, priority);

    let delivered = loop {
        let event = events.recv().await?;
        if !event.ends_job(job_id) {
            tracing::debug!("{}", event.description());
            continue;
        }
        match event {
            MailEvent::JobDelivered { delivery_id, .. } => {
                tracing::info!("Delivered as {}", delivery_id);
                break true;
            }
            MailEvent::JobDropped { error, .. } => {
                tracing::error!("Giving up: {}", error);
                break false;
            }
            other => {
                tracing::warn!("{}", other.description());
                break false;
            }
        }
    };

    service.queue().shutdown()?;
    handle.await?;
    Ok(delivered)
}
