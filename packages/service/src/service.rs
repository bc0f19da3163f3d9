//! Event-level facade over the mail queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mail_core::{JobId, Priority, Recipients};
use mail_queue::{MailQueue, MailQueueError};
use mail_templates::{EmailEvent, TemplateResolver};

/// Renders storefront events and queues the resulting email.
#[derive(Debug, Clone)]
pub struct MailService {
    queue: MailQueue,
    resolver: Arc<TemplateResolver>,
}

impl MailService {
    pub fn new(queue: MailQueue, resolver: TemplateResolver) -> Self {
        Self {
            queue,
            resolver: Arc::new(resolver),
        }
    }

    /// The underlying queue, for status checks and subscriptions.
    pub fn queue(&self) -> &MailQueue {
        &self.queue
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Queue `event` for immediate delivery at its default priority.
    pub fn send_event(
        &self,
        recipients: impl Into<Recipients>,
        event: &EmailEvent,
    ) -> Result<JobId, MailQueueError> {
        self.send_event_with(recipients, event, event.default_priority(), None)
    }

    /// Queue `event` with an explicit priority and optional earliest send time.
    pub fn send_event_with(
        &self,
        recipients: impl Into<Recipients>,
        event: &EmailEvent,
        priority: Priority,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<JobId, MailQueueError> {
        let message = self.resolver.resolve(event);
        let job_id = self
            .queue
            .submit_with(recipients, message, priority, not_before)?;
        tracing::debug!("Queued {} email as job {}", event.kind(), job_id);
        Ok(job_id)
    }
}
