//! Domain types for the webhook relay.
//!
//! This module contains the core data structures:
//! - Run: per-webhook processing state (steps, accumulated data)
//! - LogEntry: immutable records in the append-only event log
//! - InboundMessage: the Jandi webhook payload

pub mod events;
pub mod message;
pub mod run;

// Re-export commonly used types
pub use events::{LogEntry, LogEventType};
pub use message::InboundMessage;
pub use run::{Run, RunData, RunId, Step, StepRecord};
