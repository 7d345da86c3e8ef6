//! jandi-relay - Jandi webhook relay with AI summaries
//!
//! Ingests Jandi outgoing-webhook events, enriches them with an AI-generated
//! summary, optionally archives them to Notion, and serves an operational
//! dashboard.
//!
//! # Architecture
//!
//! Each inbound webhook becomes a tracked run driven through a small state
//! machine:
//! - every transition is appended to the run's step history and to a
//!   capacity-bounded event log
//! - terminal runs expire out of the live tracker after a retention window
//! - the dashboard's recent-history view is reconstructed from the log, so
//!   evicted runs stay visible
//!
//! # Modules
//!
//! - `adapters`: external integrations (OpenAI summarizer, Notion, Jandi)
//! - `core`: tracker, event log, pipeline, retry, projection
//! - `domain`: data structures (Run, LogEntry, InboundMessage)
//! - `server`: axum routes over the core
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the relay server
//! jandi-relay serve --port 3000
//!
//! # One-shot summary of stdin text
//! echo "긴 공지 내용" | jandi-relay summarize
//!
//! # Send a message to the configured Jandi webhook
//! jandi-relay send --body "점검 공지"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use adapters::{AiSummarizer, JandiClient, NotionSink, Summarizer};
pub use config::Config;
pub use core::{
    DashboardView, EventLog, MemoryEventLog, PipelineError, RetryController, RunTracker,
    SqliteEventLog, StatusProjector, SummaryFailurePolicy, WebhookPipeline,
};
pub use domain::{InboundMessage, LogEntry, LogEventType, Run, RunData, RunId, Step};
