use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mail_core::{
    DeliveryId, EmailMessage, QueueStatus, Recipients, Transport, TransportError,
    TransportFuture,
};
use mail_queue::MailQueue;
use tokio::sync::Notify;

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct SentCall {
    pub subject: String,
    pub recipients: Recipients,
    pub at: Instant,
}

/// Transport that records every call and fails subjects on request.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<SentCall>>>,
    failures: Arc<Mutex<HashMap<String, u32>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
    delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` sends of `subject`.
    pub fn fail(self, subject: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(subject.to_string(), times);
        self
    }

    /// Fail every send of `subject`.
    pub fn always_fail(self, subject: &str) -> Self {
        self.fail(subject, u32::MAX)
    }

    /// Hold sends of `subject` until the returned notify fires.
    pub fn gate(&self, subject: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(subject.to_string(), notify.clone());
        notify
    }

    /// Make every send take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.subject).collect()
    }

    pub fn count(&self, subject: &str) -> usize {
        self.calls().iter().filter(|c| c.subject == subject).count()
    }

    /// Most sends observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, recipients: &Recipients, message: &EmailMessage) -> TransportFuture {
        let subject = message.subject.clone();
        let recipients = recipients.clone();
        let this = self.clone();

        Box::pin(async move {
            let running = this.active.fetch_add(1, Ordering::SeqCst) + 1;
            this.peak.fetch_max(running, Ordering::SeqCst);

            this.calls.lock().unwrap().push(SentCall {
                subject: subject.clone(),
                recipients,
                at: Instant::now(),
            });

            let gate = this.gates.lock().unwrap().get(&subject).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Some(delay) = this.delay {
                tokio::time::sleep(delay).await;
            }

            let should_fail = {
                let mut failures = this.failures.lock().unwrap();
                match failures.get_mut(&subject) {
                    Some(remaining) if *remaining > 0 => {
                        *remaining = remaining.saturating_sub(1);
                        true
                    }
                    _ => false,
                }
            };

            this.active.fetch_sub(1, Ordering::SeqCst);
            if should_fail {
                Err(TransportError::transient(format!("{} bounced", subject)))
            } else {
                Ok(DeliveryId::new(format!("msg-{}", subject)))
            }
        })
    }
}

pub fn message(subject: &str) -> EmailMessage {
    EmailMessage::new(
        subject,
        format!("<p>{}</p>", subject),
        subject.to_string(),
    )
}

/// Poll the queue until `done` holds or `timeout` elapses.
pub async fn wait_for<F>(
    queue: &MailQueue,
    timeout: Duration,
    done: F,
) -> Result<QueueStatus, Box<dyn Error>>
where
    F: Fn(&QueueStatus) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let status = queue.status().await?;
        if done(&status) {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            return Err(format!("timed out waiting on queue, last status: {:?}", status).into());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `done` holds for the transport's recorded calls.
pub async fn wait_for_calls<F>(
    transport: &RecordingTransport,
    timeout: Duration,
    done: F,
) -> Result<(), Box<dyn Error>>
where
    F: Fn(&[SentCall]) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if done(&transport.calls()) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(format!("timed out, calls: {:?}", transport.subjects()).into());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
