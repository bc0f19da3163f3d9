#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::time::{Duration, Instant};

use chrono::Utc;
use mail_core::{MailEvent, Priority, QueueConfig};
use mail_queue::MailQueue;

use common::{RecordingTransport, message, wait_for, wait_for_calls};

const TIMEOUT: Duration = Duration::from_secs(5);

fn config(batch_size: usize) -> QueueConfig {
    QueueConfig {
        batch_size,
        retry_delay_ms: 50,
        ..QueueConfig::default()
    }
}

#[tokio::test]
async fn test_dispatch_order_follows_priority() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let gate = transport.gate("blocker");
    let (queue, _handle) = MailQueue::start(config(1), transport.clone()).await?;

    queue.submit("ops@example.com", message("blocker"))?;
    wait_for_calls(&transport, TIMEOUT, |calls| calls.len() == 1).await?;

    queue.submit_with("a@example.com", message("low"), Priority::Low, None)?;
    queue.submit_with("b@example.com", message("high"), Priority::High, None)?;
    queue.submit_with("c@example.com", message("normal"), Priority::Normal, None)?;

    let status = queue.status().await?;
    assert_eq!(status.counts_by_priority.high, 1);
    assert_eq!(status.counts_by_priority.normal, 2);
    assert_eq!(status.counts_by_priority.low, 1);
    assert!(status.processing_active);

    gate.notify_one();
    wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;

    assert_eq!(
        transport.subjects(),
        vec!["blocker", "high", "normal", "low"]
    );
    Ok(())
}

#[tokio::test]
async fn test_idle_queue_sorts_back_to_back_submissions() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(config(1), transport.clone()).await?;

    queue.submit_with("a@example.com", message("low"), Priority::Low, None)?;
    queue.submit_with("b@example.com", message("high"), Priority::High, None)?;
    queue.submit_with("c@example.com", message("normal"), Priority::Normal, None)?;

    let status = queue.status().await?;
    assert_eq!(status.total, 3);
    assert_eq!(status.counts_by_priority.high, 1);
    assert_eq!(status.counts_by_priority.normal, 1);
    assert_eq!(status.counts_by_priority.low, 1);
    assert!(status.processing_active);

    wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;
    assert_eq!(transport.subjects(), vec!["high", "normal", "low"]);
    Ok(())
}

#[tokio::test]
async fn test_idle_queue_sorts_whole_burst_with_default_batch() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(QueueConfig::default(), transport.clone()).await?;

    queue.submit_with("a@example.com", message("low"), Priority::Low, None)?;
    queue.submit_with("b@example.com", message("high"), Priority::High, None)?;
    queue.submit_with("c@example.com", message("normal"), Priority::Normal, None)?;

    let status = wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;
    assert_eq!(status.delivered, 3);
    assert_eq!(transport.subjects(), vec!["high", "normal", "low"]);
    Ok(())
}

#[tokio::test]
async fn test_status_counts_by_priority() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let gates = [
        transport.gate("low"),
        transport.gate("high"),
        transport.gate("normal"),
    ];
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;

    queue.submit_with("a@example.com", message("low"), Priority::Low, None)?;
    queue.submit_with("b@example.com", message("high"), Priority::High, None)?;
    queue.submit_with("c@example.com", message("normal"), Priority::Normal, None)?;

    let status = queue.status().await?;
    assert_eq!(status.total, 3);
    assert_eq!(status.counts_by_priority.high, 1);
    assert_eq!(status.counts_by_priority.normal, 1);
    assert_eq!(status.counts_by_priority.low, 1);

    for gate in &gates {
        gate.notify_one();
    }
    let status = wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;
    assert_eq!(status.delivered, 3);
    assert!(!status.processing_active);
    Ok(())
}

#[tokio::test]
async fn test_fifo_within_priority() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let gate = transport.gate("blocker");
    let (queue, _handle) = MailQueue::start(config(1), transport.clone()).await?;

    queue.submit("ops@example.com", message("blocker"))?;
    wait_for_calls(&transport, TIMEOUT, |calls| calls.len() == 1).await?;

    let subjects: Vec<String> = (0..5).map(|i| format!("order-{}", i)).collect();
    for subject in &subjects {
        queue.submit("buyer@example.com", message(subject))?;
    }

    gate.notify_one();
    wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;

    assert_eq!(transport.subjects()[1..], subjects[..]);
    Ok(())
}

#[tokio::test]
async fn test_always_failing_job_is_dropped_after_max_attempts() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new().always_fail("doomed");
    let config = QueueConfig {
        max_retries: 2,
        retry_delay_ms: 100,
        ..QueueConfig::default()
    };
    let (queue, _handle) = MailQueue::start(config, transport.clone()).await?;
    let mut events = queue.subscribe();

    let started = Instant::now();
    let job_id = queue.submit("nobody@example.com", message("doomed"))?;
    let status = wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(status.dropped, 1);
    assert_eq!(status.delivered, 0);

    // Backoff grows with the attempt count: 100ms, then 200ms.
    assert!(calls[1].at - calls[0].at >= Duration::from_millis(100));
    assert!(calls[2].at - calls[1].at >= Duration::from_millis(200));
    assert!(started.elapsed() >= Duration::from_millis(300));

    let mut dropped = None;
    while let Ok(event) = events.try_recv() {
        if let MailEvent::JobDropped { job_id, attempts, .. } = event {
            dropped = Some((job_id, attempts));
        }
    }
    assert_eq!(dropped, Some((job_id, 3)));

    // Nothing is retried after the drop.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(transport.count("doomed"), 3);
    Ok(())
}

#[tokio::test]
async fn test_fail_once_then_succeed() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new().fail("flaky", 1);
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;

    queue.submit("buyer@example.com", message("flaky"))?;
    let status = wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;

    assert_eq!(transport.count("flaky"), 2);
    assert_eq!(status.delivered, 1);
    assert_eq!(status.dropped, 0);
    Ok(())
}

#[tokio::test]
async fn test_scheduled_job_waits_for_not_before() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;

    let started = Instant::now();
    let not_before = Utc::now() + chrono::Duration::milliseconds(300);
    queue.submit_with(
        "buyer@example.com",
        message("review-request"),
        Priority::Normal,
        Some(not_before),
    )?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(transport.calls().is_empty());
    let status = queue.status().await?;
    assert_eq!(status.total, 1);
    assert!(status.processing_active);

    wait_for_calls(&transport, TIMEOUT, |calls| calls.len() == 1).await?;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(290));
    assert!(elapsed < Duration::from_millis(1500));
    Ok(())
}

#[tokio::test]
async fn test_immediate_job_overtakes_scheduled_job() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;

    queue.submit_with(
        "a@example.com",
        message("later"),
        Priority::High,
        Some(Utc::now() + chrono::Duration::milliseconds(150)),
    )?;
    queue.submit_with("b@example.com", message("now"), Priority::Low, None)?;

    wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;
    assert_eq!(transport.subjects(), vec!["now", "later"]);
    Ok(())
}

#[tokio::test]
async fn test_clear_discards_pending_jobs() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new().always_fail("retrying");
    let (queue, _handle) = MailQueue::start(
        QueueConfig {
            retry_delay_ms: 200,
            ..QueueConfig::default()
        },
        transport.clone(),
    )
    .await?;
    let mut events = queue.subscribe();

    let tomorrow = Utc::now() + chrono::Duration::days(1);
    queue.submit_with("a@example.com", message("scheduled"), Priority::High, Some(tomorrow))?;
    queue.submit("b@example.com", message("retrying"))?;
    wait_for_calls(&transport, TIMEOUT, |calls| calls.len() == 1).await?;
    wait_for(&queue, TIMEOUT, |s| s.in_flight == 0).await?;

    queue.clear()?;
    let status = queue.status().await?;
    assert_eq!(status.total, 0);
    assert_eq!(status.counts_by_priority.total(), 0);
    assert!(!status.processing_active);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(transport.count("retrying"), 1);
    assert_eq!(transport.count("scheduled"), 0);

    let mut cleared = None;
    while let Ok(event) = events.try_recv() {
        if let MailEvent::QueueCleared { job_ids, .. } = event {
            cleared = Some(job_ids.len());
        }
    }
    assert_eq!(cleared, Some(2));

    // The queue keeps working after a clear.
    queue.submit("c@example.com", message("after-clear"))?;
    wait_for(&queue, TIMEOUT, |s| s.total == 0 && s.delivered == 1).await?;
    Ok(())
}

#[tokio::test]
async fn test_clear_ends_in_flight_job_for_subscribers() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let gate = transport.gate("slow");
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;
    let mut events = queue.subscribe();

    let job_id = queue.submit("a@example.com", message("slow"))?;
    wait_for_calls(&transport, TIMEOUT, |calls| calls.len() == 1).await?;

    queue.clear()?;
    let status = queue.status().await?;
    assert_eq!(status.total, 0);
    assert_eq!(status.in_flight, 0);

    let last = tokio::time::timeout(TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(event) if event.ends_job(job_id) => break Ok(event),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        }
    })
    .await??;
    assert!(matches!(last, MailEvent::QueueCleared { .. }));

    // The late success is not counted as a delivery.
    gate.notify_one();
    let status = wait_for(&queue, TIMEOUT, |s| !s.processing_active).await?;
    assert_eq!(status.delivered, 0);
    assert_eq!(transport.count("slow"), 1);
    Ok(())
}

#[tokio::test]
async fn test_batches_are_bounded_and_each_job_sent_once() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new().with_delay(Duration::from_millis(30));
    let (queue, _handle) = MailQueue::start(config(2), transport.clone()).await?;

    for subject in ["one", "two", "three"] {
        queue.submit("buyer@example.com", message(subject))?;
    }
    let status = wait_for(&queue, TIMEOUT, |s| s.total == 0).await?;

    assert_eq!(status.delivered, 3);
    let mut subjects = transport.subjects();
    subjects.sort();
    assert_eq!(subjects, vec!["one", "three", "two"]);
    assert!(transport.peak_concurrency() <= 2);
    Ok(())
}

#[tokio::test]
async fn test_events_report_delivery() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;
    let mut events = queue.subscribe();

    let job_id = queue.submit(["a@example.com", "b@example.com"], message("welcome"))?;

    let delivered = tokio::time::timeout(TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(MailEvent::JobDelivered {
                    job_id: id,
                    delivery_id,
                    attempts,
                    ..
                }) if id == job_id => break Ok((delivery_id, attempts)),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        }
    })
    .await??;

    assert_eq!(delivered.0.to_string(), "msg-welcome");
    assert_eq!(delivered.1, 1);
    assert_eq!(transport.calls()[0].recipients.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_jobs_lists_queue_contents() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, _handle) = MailQueue::start(config(10), transport.clone()).await?;

    let later = Utc::now() + chrono::Duration::hours(1);
    let low = queue.submit_with("a@example.com", message("low"), Priority::Low, Some(later))?;
    let high = queue.submit_with("b@example.com", message("high"), Priority::High, Some(later))?;

    let jobs = queue.jobs(10).await?;
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![high, low]);
    assert!(jobs.iter().all(|j| j.attempts == 0 && j.max_attempts == 4));

    assert_eq!(queue.jobs(1).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_submit_after_shutdown_fails() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let (queue, handle) = MailQueue::start(config(10), transport).await?;

    queue.shutdown()?;
    handle.await?;

    assert!(queue.submit("a@example.com", message("late")).is_err());
    assert!(queue.status().await.is_err());
    Ok(())
}
