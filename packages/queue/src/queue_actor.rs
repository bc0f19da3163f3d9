//! Queue actor owning the email job lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mail_core::{
    EmailJob, JobId, MailEvent, PriorityCounts, QueueConfig, QueueStatus, Transport,
};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::dispatch::dispatch_batch;
use crate::messages::{DispatchOutcome, MailQueueMessage};

/// Shortest sleep while waiting on a scheduled job.
const MIN_IDLE_WAIT: Duration = Duration::from_millis(1);

/// Arguments for spawning a queue actor.
pub struct MailQueueArgs {
    pub config: QueueConfig,
    pub transport: Arc<dyn Transport>,
    pub event_tx: broadcast::Sender<MailEvent>,
}

/// State for the queue actor.
pub struct MailQueueState {
    config: QueueConfig,
    transport: Arc<dyn Transport>,
    /// Queued jobs, kept in dispatch order.
    pending: Vec<EmailJob>,
    /// Jobs handed to the transport in the current batch.
    in_flight: HashMap<JobId, EmailJob>,
    /// A batch is out; its outcomes have not arrived yet.
    batch_active: bool,
    /// The dispatch loop is running or waiting on a scheduled job.
    processing: bool,
    /// A `Process` message is waiting in the mailbox.
    process_scheduled: bool,
    /// Timer that re-runs the loop once the earliest scheduled job is due.
    wake: Option<JoinHandle<()>>,
    delivered: u64,
    dropped: u64,
    event_tx: broadcast::Sender<MailEvent>,
}

impl MailQueueState {
    /// Create a new queue actor state.
    pub fn new(args: MailQueueArgs) -> Self {
        Self {
            config: args.config,
            transport: args.transport,
            pending: Vec::new(),
            in_flight: HashMap::new(),
            batch_active: false,
            processing: false,
            process_scheduled: false,
            wake: None,
            delivered: 0,
            dropped: 0,
            event_tx: args.event_tx,
        }
    }

    /// Broadcast an event.
    fn broadcast(&self, event: MailEvent) {
        let _ = self.event_tx.send(event);
    }

    fn sort(&mut self) {
        self.pending.sort_by(EmailJob::dispatch_cmp);
    }

    fn status(&self) -> QueueStatus {
        let mut counts = PriorityCounts::default();
        for job in self.pending.iter().chain(self.in_flight.values()) {
            counts.record(job.priority);
        }

        QueueStatus {
            total: counts.total(),
            processing_active: self.processing,
            counts_by_priority: counts,
            in_flight: self.in_flight.len() as u64,
            delivered: self.delivered,
            dropped: self.dropped,
        }
    }

    /// Remove up to one batch of eligible jobs from the front of the queue.
    fn take_batch(&mut self, now: DateTime<Utc>) -> Vec<EmailJob> {
        let limit = self.config.effective_batch_size();
        let mut batch = Vec::new();
        let mut remaining = Vec::with_capacity(self.pending.len());

        for job in self.pending.drain(..) {
            if batch.len() < limit && job.is_eligible(now) {
                batch.push(job);
            } else {
                remaining.push(job);
            }
        }

        self.pending = remaining;
        batch
    }

    /// How long to sleep before the earliest scheduled job is due.
    fn idle_wait(&self, now: DateTime<Utc>) -> Duration {
        self.pending
            .iter()
            .filter_map(|job| job.not_before)
            .min()
            .and_then(|at| (at - now).to_std().ok())
            .unwrap_or(MIN_IDLE_WAIT)
            .clamp(MIN_IDLE_WAIT, self.config.max_idle_wait().max(MIN_IDLE_WAIT))
    }

    fn cancel_wake(&mut self) {
        if let Some(wake) = self.wake.take() {
            wake.abort();
        }
    }

    fn schedule_wake(&mut self, myself: ActorRef<MailQueueMessage>, wait: Duration) {
        self.cancel_wake();
        tracing::debug!("No job eligible, re-checking in {:?}", wait);
        self.wake = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = myself.send_message(MailQueueMessage::Process);
        }));
    }

    /// Queue a dispatch cycle behind the messages already in the mailbox,
    /// so back-to-back submissions are sorted before a batch is picked.
    fn request_process(&mut self, myself: &ActorRef<MailQueueMessage>) {
        if self.batch_active || self.process_scheduled {
            return;
        }
        match myself.send_message(MailQueueMessage::Process) {
            Ok(()) => {
                self.process_scheduled = true;
                self.processing = true;
            }
            Err(e) => tracing::warn!("Failed to schedule dispatch cycle: {}", e),
        }
    }

    /// Jobs held by the queue, in-flight first, each group in dispatch order.
    fn jobs(&self, limit: usize) -> Vec<EmailJob> {
        let mut in_flight: Vec<&EmailJob> = self.in_flight.values().collect();
        in_flight.sort_by(|a, b| a.dispatch_cmp(*b));
        in_flight
            .into_iter()
            .chain(self.pending.iter())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Run one dispatch cycle unless a batch is already out.
    fn process(&mut self, myself: ActorRef<MailQueueMessage>) {
        if self.batch_active {
            return;
        }
        self.cancel_wake();

        if self.pending.is_empty() {
            if self.processing {
                tracing::debug!("Queue drained, dispatch loop idle");
            }
            self.processing = false;
            return;
        }
        self.processing = true;

        let now = Utc::now();
        let batch = self.take_batch(now);
        if batch.is_empty() {
            let wait = self.idle_wait(now);
            self.schedule_wake(myself, wait);
            return;
        }

        tracing::debug!(
            "Dispatching {} jobs via {}",
            batch.len(),
            self.transport.name()
        );
        dispatch_batch(&self.transport, &batch, myself);
        self.batch_active = true;

        for job in batch {
            self.broadcast(MailEvent::JobDispatched {
                job_id: job.id,
                attempt: job.attempts + 1,
                timestamp: now,
            });
            self.in_flight.insert(job.id, job);
        }
    }

    /// Apply the outcomes of a finished batch.
    fn complete_batch(&mut self, outcomes: Vec<DispatchOutcome>) {
        self.batch_active = false;
        let now = Utc::now();

        for DispatchOutcome { job_id, result } in outcomes {
            let Some(mut job) = self.in_flight.remove(&job_id) else {
                tracing::debug!("Outcome for discarded job {} ignored", job_id);
                continue;
            };
            job.attempts = job.attempts.saturating_add(1);

            match result {
                Ok(delivery_id) => {
                    self.delivered += 1;
                    tracing::info!(
                        "Email {} to {} delivered as {}",
                        job.id,
                        job.recipients,
                        delivery_id
                    );
                    self.broadcast(MailEvent::JobDelivered {
                        job_id,
                        delivery_id,
                        attempts: job.attempts,
                        timestamp: now,
                    });
                }
                Err(error) => {
                    let message = error.to_string();
                    job.last_error = Some(message.clone());
                    let give_up = error.is_permanent() && self.config.drop_permanent_failures;

                    if job.can_retry() && !give_up {
                        let retry_at = self.config.next_attempt_at(job.attempts, now);
                        job.not_before = Some(retry_at);
                        tracing::warn!(
                            "Email {} attempt {}/{} failed, retrying at {}: {}",
                            job.id,
                            job.attempts,
                            job.max_attempts,
                            retry_at,
                            message
                        );
                        self.broadcast(MailEvent::JobRetrying {
                            job_id,
                            error: message,
                            attempts: job.attempts,
                            retry_at,
                            timestamp: now,
                        });
                        self.pending.push(job);
                    } else {
                        self.dropped += 1;
                        tracing::error!(
                            "Email {} to {} dropped after {} attempts: {}",
                            job.id,
                            job.recipients,
                            job.attempts,
                            message
                        );
                        self.broadcast(MailEvent::JobDropped {
                            job_id,
                            error: message,
                            attempts: job.attempts,
                            timestamp: now,
                        });
                    }
                }
            }
        }

        self.sort();
    }

    /// Discard queued and in-flight jobs, returning their ids. Running sends
    /// are left to finish and their outcomes are ignored.
    fn clear(&mut self) -> Vec<JobId> {
        let discarded = self
            .in_flight
            .drain()
            .map(|(id, _)| id)
            .chain(self.pending.drain(..).map(|job| job.id))
            .collect();
        self.cancel_wake();
        self.processing = self.batch_active;
        discarded
    }
}

/// Queue actor that orders, dispatches and retries email jobs.
pub struct MailQueueActor;

impl Actor for MailQueueActor {
    type Msg = MailQueueMessage;
    type State = MailQueueState;
    type Arguments = MailQueueArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting mail queue (transport: {}, batch size: {}, max attempts: {})",
            args.transport.name(),
            args.config.effective_batch_size(),
            args.config.max_attempts()
        );
        Ok(MailQueueState::new(args))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.cancel_wake();
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            MailQueueMessage::Submit { job } => {
                let job = *job;
                tracing::debug!(
                    "Email {} ({}) queued for {}",
                    job.id,
                    job.priority,
                    job.recipients
                );
                state.broadcast(MailEvent::JobEnqueued {
                    job_id: job.id,
                    priority: job.priority,
                    not_before: job.not_before,
                    timestamp: Utc::now(),
                });
                state.pending.push(job);
                state.sort();
                state.request_process(&myself);
            }

            MailQueueMessage::GetStatus { reply } => {
                let _ = reply.send(state.status());
            }

            MailQueueMessage::ListJobs { limit, reply } => {
                let _ = reply.send(state.jobs(limit));
            }

            MailQueueMessage::Clear => {
                let job_ids = state.clear();
                tracing::info!("Mail queue cleared, {} jobs discarded", job_ids.len());
                state.broadcast(MailEvent::QueueCleared {
                    job_ids,
                    timestamp: Utc::now(),
                });
            }

            MailQueueMessage::Process => {
                state.process_scheduled = false;
                state.process(myself);
            }

            MailQueueMessage::BatchCompleted { outcomes } => {
                state.complete_batch(outcomes);
                state.process(myself);
            }

            MailQueueMessage::Shutdown => {
                let undelivered = state.pending.len() + state.in_flight.len();
                if undelivered > 0 {
                    tracing::warn!(
                        "Shutting down mail queue with {} undelivered jobs",
                        undelivered
                    );
                } else {
                    tracing::info!("Shutting down mail queue");
                }
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}
