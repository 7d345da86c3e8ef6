//! In-memory tracker for runs that are currently processing.
//!
//! Entries live in a concurrent map keyed by run id. Terminal runs are kept
//! for a fixed retention window so the dashboard can still show them as live
//! state, then evicted lazily on read and by a periodic sweep. Anything older
//! survives only in the event log.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::{Run, RunData, RunId, Step, StepRecord};

/// Ephemeral map from run id to processing state.
pub struct RunTracker {
    runs: DashMap<RunId, Run>,
    retention: Duration,
}

impl RunTracker {
    /// Default retention for terminal runs, matching the dashboard's
    /// five-minute live-state window.
    pub const DEFAULT_RETENTION_SECS: i64 = 300;

    pub fn new(retention: Duration) -> Self {
        Self {
            runs: DashMap::new(),
            retention,
        }
    }

    /// Record a transition for `run_id`, creating the run on first use.
    ///
    /// Appends a step record, updates the current step, and shallow-merges
    /// `patch` into the accumulated data. Reaching a terminal step stamps the
    /// expiry deadline; the eviction itself happens on read or sweep.
    ///
    /// Atomic per run id: concurrent transitions for the same id serialize on
    /// the map entry, transitions for different ids do not block each other.
    pub fn transition(&self, run_id: &RunId, step: Step, patch: RunData) -> Run {
        let now = Utc::now();
        let mut entry = self
            .runs
            .entry(run_id.clone())
            .or_insert_with(|| Run::new(run_id.clone(), now));

        let run = entry.value_mut();
        run.current_step = step;
        run.steps.push(StepRecord {
            step,
            timestamp: now,
            data: patch.clone(),
        });
        run.data.merge(&patch);
        if step.is_terminal() {
            run.expires_at = Some(now + self.retention);
        }

        run.clone()
    }

    /// Look up a run. Expired entries are dropped and reported as absent.
    pub fn get(&self, run_id: &RunId) -> Option<Run> {
        let now = Utc::now();
        if let Some(entry) = self.runs.get(run_id) {
            if entry.is_expired(now) {
                drop(entry);
                self.runs.remove(run_id);
                return None;
            }
            return Some(entry.clone());
        }
        None
    }

    /// All runs whose current step is not terminal.
    ///
    /// Snapshot of the map; no ordering guarantee.
    pub fn list_active(&self) -> Vec<Run> {
        let now = Utc::now();
        self.runs
            .iter()
            .filter(|entry| !entry.is_terminal() && !entry.is_expired(now))
            .map(|entry| entry.clone())
            .collect()
    }

    /// Remove every entry past its expiry deadline. Returns how many were
    /// dropped. Safe to call from a background task at any time.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.runs.len();
        self.runs.retain(|_, run| !run.is_expired(now));
        let removed = before - self.runs.len();
        if removed > 0 {
            debug!(removed, "swept expired runs from tracker");
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.runs.len()
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(Self::DEFAULT_RETENTION_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RunId {
        RunId::new(s)
    }

    #[test]
    fn test_transition_creates_then_appends() {
        let tracker = RunTracker::default();
        let run_id = id("webhook_1_aaaa");

        let run = tracker.transition(&run_id, Step::Received, RunData::default());
        assert_eq!(run.current_step, Step::Received);
        assert_eq!(run.steps.len(), 1);

        let run = tracker.transition(&run_id, Step::AiSummaryStart, RunData::default());
        assert_eq!(run.current_step, Step::AiSummaryStart);
        assert_eq!(run.steps.len(), 2);
        assert_eq!(run.steps[1].step, Step::AiSummaryStart);
    }

    #[test]
    fn test_current_step_tracks_last_record() {
        let tracker = RunTracker::default();
        let run_id = id("webhook_1_bbbb");

        for step in [
            Step::Received,
            Step::AiSummaryStart,
            Step::AiSummaryComplete,
            Step::Completed,
        ] {
            let run = tracker.transition(&run_id, step, RunData::default());
            assert_eq!(run.current_step, run.steps.last().unwrap().step);
        }
    }

    #[test]
    fn test_data_accumulates_across_transitions() {
        let tracker = RunTracker::default();
        let run_id = id("webhook_1_cccc");

        tracker.transition(
            &run_id,
            Step::Received,
            RunData {
                text: Some("hello".into()),
                user_name: Some("kim".into()),
                ..RunData::default()
            },
        );
        tracker.transition(&run_id, Step::AiSummaryComplete, RunData::with_summary("S"));

        let run = tracker.get(&run_id).unwrap();
        assert_eq!(run.data.text.as_deref(), Some("hello"));
        assert_eq!(run.data.ai_summary.as_deref(), Some("S"));
    }

    #[test]
    fn test_list_active_excludes_terminal() {
        let tracker = RunTracker::default();
        tracker.transition(&id("webhook_1_a001"), Step::AiSummaryStart, RunData::default());
        tracker.transition(&id("webhook_1_a002"), Step::Completed, RunData::default());
        tracker.transition(&id("webhook_1_a003"), Step::Error, RunData::default());

        let active = tracker.list_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id("webhook_1_a001"));
    }

    #[test]
    fn test_terminal_run_expires_lazily() {
        // Zero retention: terminal runs are already past their deadline.
        let tracker = RunTracker::new(Duration::zero());
        let run_id = id("webhook_1_dddd");

        tracker.transition(&run_id, Step::Completed, RunData::default());
        assert_eq!(tracker.len(), 1);

        assert!(tracker.get(&run_id).is_none());
        assert_eq!(tracker.len(), 0, "lazy eviction removes the entry");
    }

    #[test]
    fn test_terminal_run_survives_within_window() {
        let tracker = RunTracker::new(Duration::seconds(300));
        let run_id = id("webhook_1_eeee");

        tracker.transition(&run_id, Step::Error, RunData::with_error("boom"));

        let run = tracker.get(&run_id).unwrap();
        assert_eq!(run.current_step, Step::Error);
        assert!(tracker.list_active().is_empty());
    }

    #[test]
    fn test_sweep_expired() {
        let tracker = RunTracker::new(Duration::zero());
        tracker.transition(&id("webhook_1_f001"), Step::Completed, RunData::default());
        tracker.transition(&id("webhook_1_f002"), Step::Error, RunData::default());
        tracker.transition(&id("webhook_1_f003"), Step::AiSummaryStart, RunData::default());

        assert_eq!(tracker.sweep_expired(), 2);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.sweep_expired(), 0);
    }
}
