//! Message types for the queue actor.

use mail_core::{EmailJob, JobId, QueueStatus, TransportResult};
use ractor::RpcReplyPort;

/// Messages for the MailQueueActor.
#[derive(Debug)]
pub enum MailQueueMessage {
    /// Insert a new job.
    Submit { job: Box<EmailJob> },

    /// Get a status snapshot.
    GetStatus { reply: RpcReplyPort<QueueStatus> },

    /// List queued jobs in dispatch order.
    ListJobs {
        limit: usize,
        reply: RpcReplyPort<Vec<EmailJob>>,
    },

    /// Discard every queued job.
    Clear,

    /// Run a dispatch cycle.
    Process,

    /// Outcomes of a dispatched batch.
    BatchCompleted { outcomes: Vec<DispatchOutcome> },

    /// Stop the queue. Undelivered jobs are discarded.
    Shutdown,
}

/// Result of one transport call within a batch.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub job_id: JobId,
    pub result: TransportResult,
}

/// Error type for queue handle operations.
#[derive(Debug, thiserror::Error)]
pub enum MailQueueError {
    #[error("Failed to start queue actor: {0}")]
    Spawn(#[from] ractor::SpawnErr),

    #[error("Queue is not running: {0}")]
    Messaging(String),

    #[error("Queue stopped before replying")]
    Closed,
}
