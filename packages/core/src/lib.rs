//! Core domain types for the transactional email pipeline.
//!
//! This crate contains shared types used across all packages:
//! - EmailJob, EmailMessage and Priority for queued sends
//! - QueueConfig and QueueStatus for queue behavior and health
//! - The Transport capability that performs delivery
//! - Events for delivery outcome notifications

mod events;
mod job;
mod queue;
mod transport;

pub use events::MailEvent;
pub use job::{EmailJob, EmailMessage, JobId, Priority, Recipients};
pub use queue::{PriorityCounts, QueueConfig, QueueStatus};
pub use transport::{
    DeliveryId, FailureKind, FnTransport, Transport, TransportError, TransportFuture,
    TransportResult,
};
