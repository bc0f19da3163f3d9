//! Queue configuration and status snapshots.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Priority;

/// Configuration for queue behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Retries after the first attempt; a job gets `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Base backoff unit in milliseconds, multiplied by the attempt count.
    pub retry_delay_ms: u64,
    /// Maximum number of jobs dispatched per cycle.
    pub batch_size: usize,
    /// Longest the loop sleeps before re-checking a queue with nothing eligible.
    pub max_idle_wait_ms: u64,
    /// Drop jobs on the first permanent transport failure instead of retrying.
    pub drop_permanent_failures: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 5_000,
            batch_size: 10,
            max_idle_wait_ms: 60_000,
            drop_permanent_failures: false,
        }
    }
}

impl QueueConfig {
    /// Attempt ceiling assigned to newly submitted jobs.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Batch size, never less than one.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_idle_wait(&self) -> Duration {
        Duration::from_millis(self.max_idle_wait_ms)
    }

    /// Backoff before the next attempt of a job that has failed `attempts` times.
    ///
    /// Linear in the attempt count: `retry_delay * attempts`.
    pub fn backoff(&self, attempts: u32) -> Duration {
        self.retry_delay().saturating_mul(attempts)
    }

    /// When a job that has failed `attempts` times becomes eligible again.
    pub fn next_attempt_at(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.backoff(attempts))
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Per-priority job counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high: u64,
    pub normal: u64,
    pub low: u64,
}

impl PriorityCounts {
    /// Count one more job of `priority`.
    pub fn record(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Normal => self.normal += 1,
            Priority::Low => self.low += 1,
        }
    }

    pub fn get(&self, priority: Priority) -> u64 {
        match priority {
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }

    pub fn total(&self) -> u64 {
        self.high + self.normal + self.low
    }
}

/// Point-in-time snapshot of a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStatus {
    /// Jobs held by the queue, including those currently being dispatched.
    pub total: u64,
    /// Whether the dispatch loop is running or waiting on a scheduled job.
    pub processing_active: bool,
    pub counts_by_priority: PriorityCounts,
    /// Jobs currently handed to the transport.
    pub in_flight: u64,
    /// Jobs delivered since the queue started.
    pub delivered: u64,
    /// Jobs dropped after exhausting their attempts since the queue started.
    pub dropped: u64,
}

impl QueueStatus {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.batch_size, 10);
        assert!(!config.drop_permanent_failures);
    }

    #[test]
    fn backoff_is_linear_in_attempts() {
        let config = QueueConfig {
            retry_delay_ms: 100,
            ..QueueConfig::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(5), Duration::from_millis(500));

        let now = Utc::now();
        assert_eq!(
            config.next_attempt_at(3, now),
            now + chrono::Duration::milliseconds(300)
        );
    }

    #[test]
    fn zero_batch_size_still_dispatches() {
        let config = QueueConfig {
            batch_size: 0,
            ..QueueConfig::default()
        };
        assert_eq!(config.effective_batch_size(), 1);
    }

    #[test]
    fn partial_config_uses_defaults() -> Result<(), serde_json::Error> {
        let config: QueueConfig = serde_json::from_str(r#"{"max_retries": 2, "batch_size": 5}"#)?;
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.retry_delay_ms, 5_000);
        Ok(())
    }

    #[test]
    fn priority_counts() {
        let mut counts = PriorityCounts::default();
        counts.record(Priority::High);
        counts.record(Priority::Low);
        counts.record(Priority::Low);
        assert_eq!(counts.get(Priority::High), 1);
        assert_eq!(counts.get(Priority::Normal), 0);
        assert_eq!(counts.get(Priority::Low), 2);
        assert_eq!(counts.total(), 3);
    }
}
