//! Summary regeneration for runs that already finished.
//!
//! Works entirely from the archived `webhook_received` log entry, so a run
//! that has long been evicted from the tracker can still be retried. Each
//! retry appends further steps under the same run id rather than resetting
//! history.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use super::error::PipelineError;
use super::event_log::EventLog;
use super::tracker::RunTracker;
use crate::adapters::summarizer::{is_failure_text, Summarizer};
use crate::domain::{LogEntry, LogEventType, RunData, RunId, Step};

/// Result of a successful retry.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub webhook_id: RunId,
    pub new_summary: String,
    pub original_text: String,
}

/// Re-enters the summarization phase for a completed or failed run.
pub struct RetryController {
    tracker: Arc<RunTracker>,
    log: Arc<dyn EventLog>,
    summarizer: Arc<dyn Summarizer>,
}

impl RetryController {
    pub fn new(
        tracker: Arc<RunTracker>,
        log: Arc<dyn EventLog>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            tracker,
            log,
            summarizer,
        }
    }

    /// Regenerate the summary for `run_id`.
    ///
    /// Rejected while the run is mid-flight; fails with not-found when no
    /// archived `webhook_received` entry (with text) exists. Performs no
    /// tracker mutation before both checks pass.
    #[instrument(skip(self), fields(webhook_id = %run_id))]
    pub async fn retry(&self, run_id: &RunId) -> Result<RetryOutcome, PipelineError> {
        if let Some(run) = self.tracker.get(run_id) {
            if !run.is_terminal() {
                return Err(PipelineError::StillProcessing {
                    run_id: run_id.clone(),
                    current_step: run.current_step,
                });
            }
        }

        let entries = self.log.all().await?;
        let archived = entries.iter().find(|e| {
            e.webhook_id.as_ref() == Some(run_id)
                && e.event_type == LogEventType::WebhookReceived
        });
        let Some(archived) = archived else {
            return Err(PipelineError::RunNotFound(run_id.clone()));
        };

        let seed: RunData = serde_json::from_value(archived.data.clone()).unwrap_or_default();
        let Some(text) = seed.text.clone().filter(|t| !t.is_empty()) else {
            return Err(PipelineError::RunNotFound(run_id.clone()));
        };

        info!("regenerating AI summary");
        self.tracker.transition(
            run_id,
            Step::AiSummaryStart,
            RunData {
                is_retry: true,
                ..seed.clone()
            },
        );

        match self.summarizer.summarize(&text).await {
            Some(summary) if !is_failure_text(&summary) => {
                self.tracker.transition(
                    run_id,
                    Step::AiSummaryComplete,
                    RunData {
                        ai_summary: Some(summary.clone()),
                        is_retry: true,
                        ..RunData::default()
                    },
                );
                self.log
                    .append(LogEntry::new(
                        LogEventType::AiSummaryRegenerated,
                        json!({
                            "originalText": text,
                            "summary": summary,
                            "author": seed.user_name.as_deref().unwrap_or("알 수 없음"),
                            "room": seed.room_name.as_deref().unwrap_or("알 수 없음"),
                            "retryTimestamp": chrono::Utc::now().to_rfc3339(),
                        }),
                        Some(run_id.clone()),
                    ))
                    .await?;

                Ok(RetryOutcome {
                    webhook_id: run_id.clone(),
                    new_summary: summary,
                    original_text: text,
                })
            }
            returned => {
                warn!(returned = ?returned, "AI summary regeneration failed");
                self.tracker.transition(
                    run_id,
                    Step::Error,
                    RunData::with_error("AI 요약 재생성 실패"),
                );
                let entry = LogEntry::new(
                    LogEventType::WebhookError,
                    json!({ "error": "AI 요약 재생성 실패", "originalText": text }),
                    Some(run_id.clone()),
                );
                if let Err(log_err) = self.log.append(entry).await {
                    warn!(error = %log_err, "failed to record retry error");
                }
                Err(PipelineError::Gateway("AI 요약 재생성 실패".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_log::MemoryEventLog;
    use async_trait::async_trait;

    struct FixedSummarizer(Option<String>);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _text: &str) -> Option<String> {
            self.0.clone()
        }
    }

    fn controller(
        summary: Option<&str>,
    ) -> (RetryController, Arc<RunTracker>, Arc<MemoryEventLog>) {
        let tracker = Arc::new(RunTracker::default());
        let log = Arc::new(MemoryEventLog::default());
        let summarizer = Arc::new(FixedSummarizer(summary.map(str::to_string)));
        let controller = RetryController::new(tracker.clone(), log.clone(), summarizer);
        (controller, tracker, log)
    }

    async fn archive_received(log: &MemoryEventLog, run_id: &RunId, text: &str) {
        log.append(LogEntry::new(
            LogEventType::WebhookReceived,
            json!({ "text": text, "userName": "kim", "roomName": "dev" }),
            Some(run_id.clone()),
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_retry_conflicts_while_midflight() {
        let (controller, tracker, _log) = controller(Some("요약"));
        let run_id = RunId::new("webhook_1_aaaa");
        tracker.transition(&run_id, Step::AiSummaryStart, RunData::default());

        let err = controller.retry(&run_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::StillProcessing { .. }));
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_retry_not_found_without_archived_entry() {
        let (controller, tracker, _log) = controller(Some("요약"));
        let run_id = RunId::new("webhook_1_bbbb");

        let err = controller.retry(&run_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::RunNotFound(_)));
        // No tracker mutation on the miss path.
        assert!(tracker.get(&run_id).is_none());
    }

    #[tokio::test]
    async fn test_retry_regenerates_from_archived_text() {
        let (controller, tracker, log) = controller(Some("새 요약"));
        let run_id = RunId::new("webhook_1_cccc");
        archive_received(&log, &run_id, "원본 메시지 텍스트입니다").await;

        let outcome = controller.retry(&run_id).await.unwrap();
        assert_eq!(outcome.new_summary, "새 요약");
        assert_eq!(outcome.original_text, "원본 메시지 텍스트입니다");

        let run = tracker.get(&run_id).unwrap();
        assert_eq!(run.current_step, Step::AiSummaryComplete);
        assert!(run.data.is_retry);
        assert_eq!(run.data.ai_summary.as_deref(), Some("새 요약"));

        let entries = log.all().await.unwrap();
        assert_eq!(
            entries.last().unwrap().event_type,
            LogEventType::AiSummaryRegenerated
        );
    }

    #[tokio::test]
    async fn test_retry_failure_transitions_to_error() {
        let (controller, tracker, log) = controller(None);
        let run_id = RunId::new("webhook_1_dddd");
        archive_received(&log, &run_id, "원본 메시지 텍스트입니다").await;

        let err = controller.retry(&run_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Gateway(_)));
        assert_eq!(tracker.get(&run_id).unwrap().current_step, Step::Error);
    }

    #[tokio::test]
    async fn test_retry_allowed_after_terminal_run() {
        let (controller, tracker, log) = controller(Some("다시 요약"));
        let run_id = RunId::new("webhook_1_eeee");
        archive_received(&log, &run_id, "원본 메시지 텍스트입니다").await;
        tracker.transition(&run_id, Step::Completed, RunData::default());

        let outcome = controller.retry(&run_id).await.unwrap();
        assert_eq!(outcome.new_summary, "다시 요약");

        // History appended, not reset.
        let run = tracker.get(&run_id).unwrap();
        assert_eq!(run.steps.len(), 3);
    }
}
