//! Error taxonomy for the processing core.

use thiserror::Error;

use crate::domain::{RunId, Step};

/// Errors from an event log backend.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the pipeline, retry controller, and related entry points.
///
/// `status_code` gives the HTTP-equivalent code the server layer maps each
/// variant to; the core itself stays transport-free.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The same run id is already mid-flight from a concurrent call.
    #[error("webhook {run_id} is already being processed (current step: {current_step})")]
    DuplicateRun { run_id: RunId, current_step: Step },

    /// A retry was requested while the run is still active.
    #[error("webhook {run_id} is still processing (current step: {current_step})")]
    StillProcessing { run_id: RunId, current_step: Step },

    /// No archived data exists for the run (or it lacks text).
    #[error("no archived webhook data found for {0}")]
    RunNotFound(RunId),

    /// The summarization gateway produced no usable summary.
    #[error("summarization failed: {0}")]
    Gateway(String),

    #[error(transparent)]
    EventLog(#[from] EventLogError),

    /// Anything else, caught once at the pipeline boundary.
    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::DuplicateRun { .. } | PipelineError::StillProcessing { .. } => 409,
            PipelineError::RunNotFound(_) => 404,
            PipelineError::Gateway(_)
            | PipelineError::EventLog(_)
            | PipelineError::Unexpected(_) => 500,
        }
    }
}
