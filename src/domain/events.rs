//! Log entries for the append-only event log.
//!
//! Entries are immutable facts. Once a run has been evicted from the live
//! tracker, its log entries are the only remaining record and the dashboard
//! view is reconstructed from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::RunId;

/// Types of events recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    /// An inbound webhook arrived.
    WebhookReceived,

    /// A summary was generated during normal processing.
    AiSummaryGenerated,

    /// A summary was regenerated via the retry endpoint.
    AiSummaryRegenerated,

    /// The Notion save phase started.
    NotionSaveStart,

    /// A Notion page was created.
    NotionSaveComplete,

    /// Processing finished successfully.
    WebhookProcessed,

    /// Processing failed.
    WebhookError,
}

impl LogEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEventType::WebhookReceived => "webhook_received",
            LogEventType::AiSummaryGenerated => "ai_summary_generated",
            LogEventType::AiSummaryRegenerated => "ai_summary_regenerated",
            LogEventType::NotionSaveStart => "notion_save_start",
            LogEventType::NotionSaveComplete => "notion_save_complete",
            LogEventType::WebhookProcessed => "webhook_processed",
            LogEventType::WebhookError => "webhook_error",
        }
    }
}

impl std::fmt::Display for LogEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,

    /// What happened.
    pub event_type: LogEventType,

    /// Event payload; shape depends on `event_type`.
    pub data: serde_json::Value,

    /// The run this entry belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<RunId>,
}

impl LogEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(event_type: LogEventType, data: serde_json::Value, webhook_id: Option<RunId>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            data,
            webhook_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&LogEventType::WebhookReceived).unwrap(),
            "\"webhook_received\""
        );
        assert_eq!(
            serde_json::to_string(&LogEventType::AiSummaryRegenerated).unwrap(),
            "\"ai_summary_regenerated\""
        );
        assert_eq!(LogEventType::NotionSaveStart.as_str(), "notion_save_start");
    }

    #[test]
    fn test_log_entry_round_trip() {
        let entry = LogEntry::new(
            LogEventType::AiSummaryGenerated,
            serde_json::json!({"summary": "요약", "author": "kim"}),
            Some(RunId::new("webhook_1_aaaa")),
        );

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: LogEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_type, LogEventType::AiSummaryGenerated);
        assert_eq!(parsed.data["summary"], "요약");
        assert_eq!(parsed.webhook_id, Some(RunId::new("webhook_1_aaaa")));
    }

    #[test]
    fn test_log_entry_without_run_id_omits_field() {
        let entry = LogEntry::new(LogEventType::WebhookError, serde_json::json!({}), None);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("webhookId"));
    }
}
