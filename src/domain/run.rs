//! Run state for a single inbound webhook.
//!
//! A Run is created on the first transition for its id and only ever mutated
//! through `RunTracker::transition`. Terminal runs carry an expiry timestamp
//! instead of relying on a timer for eviction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::InboundMessage;

/// Opaque identifier for one webhook processing run.
///
/// Generated at ingestion time from a millisecond timestamp plus a random
/// suffix, so collisions between concurrent requests are negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id: `webhook_{unix_millis}_{8 random hex chars}`.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "webhook_{}_{}",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named stage in the processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Received,
    AiSummaryStart,
    AiSummaryComplete,
    NotionSaveStart,
    NotionSaveComplete,
    Completed,
    Error,
}

impl Step {
    /// Terminal steps have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Completed | Step::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Received => "received",
            Step::AiSummaryStart => "ai_summary_start",
            Step::AiSummaryComplete => "ai_summary_complete",
            Step::NotionSaveStart => "notion_save_start",
            Step::NotionSaveComplete => "notion_save_complete",
            Step::Completed => "completed",
            Step::Error => "error",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields accumulated over a run's lifetime.
///
/// Transitions shallow-merge a patch into the run's data: a set field
/// overwrites the previous value, an unset field leaves it alone. Keys are
/// never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notion_page_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_retry: bool,
}

impl RunData {
    /// Seed data from an inbound webhook payload.
    pub fn from_message(message: &InboundMessage) -> Self {
        Self {
            text: message.text.clone(),
            user_name: message.user_name.clone(),
            room_name: message.room_name.clone(),
            team_name: message.team_name.clone(),
            created_at: message.created_at.clone(),
            ..Self::default()
        }
    }

    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            ai_summary: Some(summary.into()),
            ..Self::default()
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Shallow-merge `patch` over `self`. Set fields win, unset fields are
    /// kept, nothing is ever cleared.
    pub fn merge(&mut self, patch: &RunData) {
        fn take(dst: &mut Option<String>, src: &Option<String>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.text, &patch.text);
        take(&mut self.user_name, &patch.user_name);
        take(&mut self.room_name, &patch.room_name);
        take(&mut self.team_name, &patch.team_name);
        take(&mut self.created_at, &patch.created_at);
        take(&mut self.ai_summary, &patch.ai_summary);
        take(&mut self.error, &patch.error);
        take(&mut self.notion_page_id, &patch.notion_page_id);
        self.is_retry |= patch.is_retry;
    }
}

/// One recorded transition: which step, when, and the data patch it carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: Step,
    pub timestamp: DateTime<Utc>,
    pub data: RunData,
}

/// One tracked webhook processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,

    /// When the first transition was recorded.
    pub start_time: DateTime<Utc>,

    /// Always equal to the step of the last element of `steps`.
    pub current_step: Step,

    /// Append-only transition history, in chronological order.
    pub steps: Vec<StepRecord>,

    /// Accumulated data across all transitions.
    pub data: RunData,

    /// Set when a terminal step is reached; the run is evicted from the
    /// tracker once this passes. Not part of the wire representation.
    #[serde(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time: started_at,
            current_step: Step::Received,
            steps: Vec::new(),
            data: RunData::default(),
            expires_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step.is_terminal()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let id = RunId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "webhook");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_run_id_uniqueness() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_step_serialization() {
        let json = serde_json::to_string(&Step::AiSummaryStart).unwrap();
        assert_eq!(json, "\"ai_summary_start\"");
        let parsed: Step = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, Step::Completed);
    }

    #[test]
    fn test_terminal_steps() {
        assert!(Step::Completed.is_terminal());
        assert!(Step::Error.is_terminal());
        assert!(!Step::Received.is_terminal());
        assert!(!Step::NotionSaveComplete.is_terminal());
    }

    #[test]
    fn test_merge_overwrites_set_fields_only() {
        let mut data = RunData {
            text: Some("original".to_string()),
            user_name: Some("kim".to_string()),
            ..RunData::default()
        };

        data.merge(&RunData::with_summary("요약"));

        assert_eq!(data.text.as_deref(), Some("original"));
        assert_eq!(data.user_name.as_deref(), Some("kim"));
        assert_eq!(data.ai_summary.as_deref(), Some("요약"));
    }

    #[test]
    fn test_merge_never_clears() {
        let mut data = RunData::with_summary("first");
        data.merge(&RunData::default());
        assert_eq!(data.ai_summary.as_deref(), Some("first"));

        data.merge(&RunData::with_summary("second"));
        assert_eq!(data.ai_summary.as_deref(), Some("second"));
    }

    #[test]
    fn test_merge_retry_flag_sticks() {
        let mut data = RunData {
            is_retry: true,
            ..RunData::default()
        };
        data.merge(&RunData::default());
        assert!(data.is_retry);
    }

    #[test]
    fn test_run_data_from_arbitrary_json() {
        // Webhook bodies can carry extra keys (token etc.); they are ignored.
        let value = serde_json::json!({
            "token": "abc",
            "text": "hello",
            "userName": "kim",
            "roomName": "dev",
            "keyword": "ignored"
        });
        let data: RunData = serde_json::from_value(value).unwrap();
        assert_eq!(data.text.as_deref(), Some("hello"));
        assert_eq!(data.user_name.as_deref(), Some("kim"));
        assert!(data.team_name.is_none());
    }

    #[test]
    fn test_run_expiry() {
        let now = Utc::now();
        let mut run = Run::new(RunId::new("webhook_1_aaaa"), now);
        assert!(!run.is_expired(now));

        run.expires_at = Some(now);
        assert!(run.is_expired(now));
        assert!(!run.is_expired(now - chrono::Duration::seconds(1)));
    }
}
