//! Caller-facing handle for a running mail queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use mail_core::{
    EmailJob, EmailMessage, JobId, MailEvent, Priority, QueueConfig, QueueStatus, Recipients,
    Transport,
};
use ractor::{Actor, ActorRef};
use tokio::sync::broadcast;

use crate::messages::{MailQueueError, MailQueueMessage};
use crate::queue_actor::{MailQueueActor, MailQueueArgs};

/// Capacity of the event channel handed to subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Handle to a running mail queue.
///
/// Cloning the handle shares the same queue. Submissions never wait for
/// delivery; subscribe to the event stream to observe outcomes.
#[derive(Clone)]
pub struct MailQueue {
    actor: ActorRef<MailQueueMessage>,
    max_attempts: u32,
    sequence: Arc<AtomicU64>,
    event_tx: broadcast::Sender<MailEvent>,
}

impl MailQueue {
    /// Start a queue that delivers through `transport`.
    pub async fn start<T: Transport>(
        config: QueueConfig,
        transport: T,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), MailQueueError> {
        Self::start_shared(config, Arc::new(transport)).await
    }

    /// Start a queue with a transport shared with other owners.
    pub async fn start_shared(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), MailQueueError> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let max_attempts = config.max_attempts();
        let args = MailQueueArgs {
            config,
            transport,
            event_tx: event_tx.clone(),
        };

        let (actor, handle) = Actor::spawn(None, MailQueueActor, args).await?;

        let queue = Self {
            actor,
            max_attempts,
            sequence: Arc::new(AtomicU64::new(0)),
            event_tx,
        };
        Ok((queue, handle))
    }

    /// Queue `message` for immediate delivery at normal priority.
    pub fn submit(
        &self,
        recipients: impl Into<Recipients>,
        message: EmailMessage,
    ) -> Result<JobId, MailQueueError> {
        self.submit_with(recipients, message, Priority::Normal, None)
    }

    /// Queue `message` with an explicit priority and optional earliest send time.
    ///
    /// Returns as soon as the job is handed to the queue.
    pub fn submit_with(
        &self,
        recipients: impl Into<Recipients>,
        message: EmailMessage,
        priority: Priority,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<JobId, MailQueueError> {
        let job = EmailJob::new(recipients, message)
            .with_priority(priority)
            .with_not_before(not_before)
            .with_max_attempts(self.max_attempts)
            .with_sequence(self.sequence.fetch_add(1, Ordering::Relaxed));
        let job_id = job.id;

        self.send(MailQueueMessage::Submit { job: Box::new(job) })?;
        Ok(job_id)
    }

    /// Snapshot of the queue's contents.
    pub async fn status(&self) -> Result<QueueStatus, MailQueueError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.send(MailQueueMessage::GetStatus { reply: tx.into() })?;
        rx.await.map_err(|_| MailQueueError::Closed)
    }

    /// Jobs currently held: in-flight jobs first, then queued ones, each in
    /// dispatch order.
    pub async fn jobs(&self, limit: usize) -> Result<Vec<EmailJob>, MailQueueError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.send(MailQueueMessage::ListJobs {
            limit,
            reply: tx.into(),
        })?;
        rx.await.map_err(|_| MailQueueError::Closed)
    }

    /// Discard all pending jobs without delivering them.
    pub fn clear(&self) -> Result<(), MailQueueError> {
        self.send(MailQueueMessage::Clear)
    }

    /// Subscribe to delivery events.
    pub fn subscribe(&self) -> broadcast::Receiver<MailEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the queue. Jobs still queued are discarded.
    pub fn shutdown(&self) -> Result<(), MailQueueError> {
        self.send(MailQueueMessage::Shutdown)
    }

    fn send(&self, message: MailQueueMessage) -> Result<(), MailQueueError> {
        self.actor
            .send_message(message)
            .map_err(|e| MailQueueError::Messaging(e.to_string()))
    }
}

impl std::fmt::Debug for MailQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailQueue")
            .field("actor", &self.actor.get_id())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
