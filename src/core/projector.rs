//! Dashboard projection.
//!
//! Merges live tracker entries with history replayed from the event log.
//! Completed runs are evicted from the tracker after the retention window,
//! so the recent-history view has to be rebuilt from log entries alone.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::event_log::EventLog;
use super::tracker::RunTracker;
use crate::domain::{LogEntry, LogEventType, Run, RunData, RunId, Step, StepRecord};

/// Placeholder for fields missing from archived entries.
pub const UNKNOWN: &str = "알 수 없음";

/// How many finished runs the recent-history view shows.
const RECENT_LIMIT: usize = 10;

/// Dashboard-facing view of processing state.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Runs currently mid-flight, straight from the tracker.
    pub processing: Vec<Run>,

    /// Recently finished runs, reconstructed from the log.
    pub recent: Vec<Run>,
}

/// Builds the dashboard view from the tracker and the event log.
pub struct StatusProjector {
    tracker: Arc<RunTracker>,
    log: Arc<dyn EventLog>,
}

impl StatusProjector {
    pub fn new(tracker: Arc<RunTracker>, log: Arc<dyn EventLog>) -> Self {
        Self { tracker, log }
    }

    /// Produce the current view. Pure read: calling it twice with no
    /// intervening writes yields identical results, and empty stores yield
    /// empty lists rather than errors.
    pub async fn project(&self) -> DashboardView {
        let processing = self.tracker.list_active();

        let entries = match self.log.all().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "event log unavailable, projecting without history");
                Vec::new()
            }
        };
        let recent = reconstruct_recent(&entries);

        DashboardView { processing, recent }
    }
}

/// Rebuild the most recent finished runs from log entries.
fn reconstruct_recent(entries: &[LogEntry]) -> Vec<Run> {
    let seeds: Vec<(&RunId, &LogEntry)> = entries
        .iter()
        .filter(|e| {
            matches!(
                e.event_type,
                LogEventType::WebhookProcessed | LogEventType::WebhookError
            )
        })
        .filter_map(|e| e.webhook_id.as_ref().map(|id| (id, e)))
        .collect();

    let start = seeds.len().saturating_sub(RECENT_LIMIT);
    seeds[start..]
        .iter()
        .map(|(id, seed)| reconstruct_run(entries, id, seed))
        .collect()
}

/// Rebuild one run's display state from every log entry sharing its id.
fn reconstruct_run(entries: &[LogEntry], run_id: &RunId, seed: &LogEntry) -> Run {
    let related: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| e.webhook_id.as_ref() == Some(run_id))
        .collect();

    let received = related
        .iter()
        .find(|e| e.event_type == LogEventType::WebhookReceived);
    let summary_entry = related
        .iter()
        .filter(|e| {
            matches!(
                e.event_type,
                LogEventType::AiSummaryGenerated | LogEventType::AiSummaryRegenerated
            )
        })
        .last();

    let mut steps = Vec::new();
    if let Some(received) = received {
        steps.push(StepRecord {
            step: Step::Received,
            timestamp: received.timestamp,
            data: serde_json::from_value(received.data.clone()).unwrap_or_default(),
        });
    }

    let ai_summary = summary_entry.and_then(|e| {
        e.data
            .get("summary")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    });
    if let Some(summary_entry) = summary_entry {
        steps.push(StepRecord {
            step: Step::AiSummaryStart,
            timestamp: summary_entry.timestamp,
            data: RunData::default(),
        });
        steps.push(StepRecord {
            step: Step::AiSummaryComplete,
            timestamp: summary_entry.timestamp,
            data: RunData {
                ai_summary: ai_summary.clone(),
                ..RunData::default()
            },
        });
    }

    let current_step = if seed.event_type == LogEventType::WebhookError {
        Step::Error
    } else {
        Step::Completed
    };

    let field = |key: &str| {
        received
            .and_then(|e| e.data.get(key))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    };

    Run {
        id: run_id.clone(),
        start_time: received.map_or(seed.timestamp, |e| e.timestamp),
        current_step,
        steps,
        data: RunData {
            text: Some(field("text").unwrap_or_default()),
            user_name: Some(field("userName").unwrap_or_else(|| UNKNOWN.to_string())),
            room_name: Some(field("roomName").unwrap_or_else(|| UNKNOWN.to_string())),
            team_name: Some(field("teamName").unwrap_or_else(|| UNKNOWN.to_string())),
            ai_summary,
            ..RunData::default()
        },
        expires_at: None,
    }
}
