//! Event types for delivery outcome notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeliveryId, JobId, Priority};

/// Events emitted by an email queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MailEvent {
    /// A job was accepted by the queue.
    JobEnqueued {
        job_id: JobId,
        priority: Priority,
        not_before: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
    /// A job was handed to the transport.
    JobDispatched {
        job_id: JobId,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// The transport accepted a job; it has left the queue.
    JobDelivered {
        job_id: JobId,
        delivery_id: DeliveryId,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
    /// A dispatch attempt failed and the job was rescheduled.
    JobRetrying {
        job_id: JobId,
        error: String,
        attempts: u32,
        retry_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    /// A job was removed without being delivered.
    JobDropped {
        job_id: JobId,
        error: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
    /// Queued and in-flight jobs were discarded. No further events follow
    /// for the listed jobs.
    QueueCleared {
        job_ids: Vec<JobId>,
        timestamp: DateTime<Utc>,
    },
}

impl MailEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MailEvent::JobEnqueued { timestamp, .. } => *timestamp,
            MailEvent::JobDispatched { timestamp, .. } => *timestamp,
            MailEvent::JobDelivered { timestamp, .. } => *timestamp,
            MailEvent::JobRetrying { timestamp, .. } => *timestamp,
            MailEvent::JobDropped { timestamp, .. } => *timestamp,
            MailEvent::QueueCleared { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            MailEvent::JobEnqueued { job_id, .. } => Some(*job_id),
            MailEvent::JobDispatched { job_id, .. } => Some(*job_id),
            MailEvent::JobDelivered { job_id, .. } => Some(*job_id),
            MailEvent::JobRetrying { job_id, .. } => Some(*job_id),
            MailEvent::JobDropped { job_id, .. } => Some(*job_id),
            MailEvent::QueueCleared { .. } => None,
        }
    }

    /// Whether this event ends the job's life in the queue.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MailEvent::JobDelivered { .. } | MailEvent::JobDropped { .. }
        )
    }

    /// Whether this event is the last one `job_id` will see, including a
    /// clear that discarded it.
    pub fn ends_job(&self, job_id: JobId) -> bool {
        match self {
            MailEvent::QueueCleared { job_ids, .. } => job_ids.contains(&job_id),
            event => event.is_terminal() && event.job_id() == Some(job_id),
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            MailEvent::JobEnqueued {
                job_id, priority, ..
            } => format!("Job {} enqueued ({})", job_id, priority),
            MailEvent::JobDispatched {
                job_id, attempt, ..
            } => format!("Job {} dispatched (attempt {})", job_id, attempt),
            MailEvent::JobDelivered {
                job_id,
                delivery_id,
                ..
            } => format!("Job {} delivered as {}", job_id, delivery_id),
            MailEvent::JobRetrying {
                job_id,
                error,
                retry_at,
                ..
            } => format!("Job {} failed: {} (retry at {})", job_id, error, retry_at),
            MailEvent::JobDropped {
                job_id,
                error,
                attempts,
                ..
            } => format!(
                "Job {} dropped after {} attempts: {}",
                job_id, attempts, error
            ),
            MailEvent::QueueCleared { job_ids, .. } => {
                format!("Queue cleared, {} jobs discarded", job_ids.len())
            }
        }
    }
}
