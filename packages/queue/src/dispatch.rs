//! Batch dispatch through the transport.

use std::sync::Arc;

use futures_util::future::join_all;
use mail_core::{EmailJob, Transport, TransportError};
use ractor::ActorRef;

use crate::messages::{DispatchOutcome, MailQueueMessage};

/// Send every job of `batch` concurrently and report the outcomes back to
/// `queue` once all of them have finished.
pub(crate) fn dispatch_batch(
    transport: &Arc<dyn Transport>,
    batch: &[EmailJob],
    queue: ActorRef<MailQueueMessage>,
) {
    let sends: Vec<_> = batch
        .iter()
        .map(|job| (job.id, tokio::spawn(transport.send(&job.recipients, &job.message))))
        .collect();

    let transport_name = transport.name().to_string();
    tokio::spawn(async move {
        let (ids, handles): (Vec<_>, Vec<_>) = sends.into_iter().unzip();
        let outcomes = ids
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(job_id, joined)| DispatchOutcome {
                job_id,
                result: joined.unwrap_or_else(|e| {
                    Err(TransportError::transient(format!(
                        "{} send task failed: {}",
                        transport_name, e
                    )))
                }),
            })
            .collect();

        if let Err(e) = queue.send_message(MailQueueMessage::BatchCompleted { outcomes }) {
            tracing::warn!("Queue stopped before batch outcomes arrived: {}", e);
        }
    });
}
