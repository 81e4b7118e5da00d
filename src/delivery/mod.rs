//! Reliable delivery of violation events to the logging endpoint.
//!
//! This module contains:
//! - The transport seam and its HTTP implementation
//! - The persisted FIFO retry queue
//! - The pipeline combining immediate sends with a backoff drain

pub mod pipeline;
pub mod queue;
pub mod transport;

// Re-export commonly used types
pub use pipeline::{DeliveryPipeline, RetryPolicy};
pub use queue::{RetryQueue, TRUNCATED_EVIDENCE_PLACEHOLDER};
pub use transport::{DeliveryError, HttpLogTransport, LogResponse, LogTransport, SendOutcome};
