//! Processing core: state tracking, event logging, and the pipeline.
//!
//! Everything here is transport-free; the HTTP layer in `server` is a thin
//! wrapper over these services.

pub mod error;
pub mod event_log;
pub mod pipeline;
pub mod projector;
pub mod retry;
pub mod tracker;

pub use error::{EventLogError, PipelineError};
pub use event_log::{EventLog, MemoryEventLog, SqliteEventLog, DEFAULT_LOG_CAPACITY};
pub use pipeline::{IngestOutcome, SummaryFailurePolicy, WebhookPipeline};
pub use projector::{DashboardView, StatusProjector};
pub use retry::{RetryController, RetryOutcome};
pub use tracker::RunTracker;
