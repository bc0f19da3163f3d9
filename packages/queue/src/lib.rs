//! Actor-backed transactional email queue.
//!
//! This crate provides the Ractor-based queue that orders, dispatches and
//! retries email jobs.
//!
//! # Architecture
//!
//! - `MailQueueActor` - Owns the job list and runs the dispatch loop
//! - `MailQueue` - Cloneable handle callers submit through
//! - Batches are sent concurrently on tokio tasks and reported back to the actor
//!
//! # Usage
//!
//! ```ignore
//! use mail_queue::MailQueue;
//! use mail_core::{EmailMessage, Priority, QueueConfig};
//!
//! let (queue, _handle) = MailQueue::start(QueueConfig::default(), transport).await?;
//! let job_id = queue.submit_with("buyer@example.com", message, Priority::High, None)?;
//! let status = queue.status().await?;
//! ```

mod dispatch;
mod mail_queue;
mod messages;
mod queue_actor;

pub use mail_queue::MailQueue;
pub use messages::{DispatchOutcome, MailQueueError, MailQueueMessage};
pub use queue_actor::{MailQueueActor, MailQueueArgs};
