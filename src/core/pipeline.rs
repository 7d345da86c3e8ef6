//! Webhook processing pipeline.
//!
//! Drives one inbound event through
//! RECEIVED → AI_SUMMARY_START → AI_SUMMARY_COMPLETE → (NOTION_SAVE_*) →
//! COMPLETED, or into ERROR, writing to the tracker and the event log at
//! every transition. Summarization failure is non-fatal by default: the run
//! still completes, just without a summary.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, instrument, warn};

use super::error::{EventLogError, PipelineError};
use super::event_log::EventLog;
use super::tracker::RunTracker;
use crate::adapters::notion::DocumentSink;
use crate::adapters::summarizer::{is_failure_text, Summarizer};
use crate::domain::{InboundMessage, LogEntry, LogEventType, RunData, RunId, Step};

/// What happens to the run when the summarization gateway fails.
///
/// `Continue` records an ERROR transition for the sub-step but carries the
/// run through to COMPLETED without a summary. `Abort` fails the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFailurePolicy {
    #[default]
    Continue,
    Abort,
}

impl FromStr for SummaryFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown summary failure policy: {other}")),
        }
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub webhook_id: RunId,
    pub ai_summary: Option<String>,
    pub notion_page_id: Option<String>,
    pub message: InboundMessage,
}

/// The state machine driving one webhook through its processing steps.
pub struct WebhookPipeline {
    tracker: Arc<RunTracker>,
    log: Arc<dyn EventLog>,
    summarizer: Arc<dyn Summarizer>,
    sink: Option<Arc<dyn DocumentSink>>,
    policy: SummaryFailurePolicy,
}

impl WebhookPipeline {
    pub fn new(
        tracker: Arc<RunTracker>,
        log: Arc<dyn EventLog>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            tracker,
            log,
            summarizer,
            sink: None,
            policy: SummaryFailurePolicy::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DocumentSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_policy(mut self, policy: SummaryFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process one inbound event under a freshly generated `run_id`.
    ///
    /// Any unexpected failure is caught here once: the run transitions to
    /// ERROR, a `webhook_error` entry is logged, and the error is returned to
    /// the caller. A duplicate-run conflict passes through untouched.
    #[instrument(skip(self, message), fields(webhook_id = %run_id))]
    pub async fn ingest(
        &self,
        message: InboundMessage,
        run_id: RunId,
    ) -> Result<IngestOutcome, PipelineError> {
        match self.process(&message, &run_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err @ PipelineError::DuplicateRun { .. }) => Err(err),
            Err(err) => {
                let msg = err.to_string();
                error!(error = %msg, "webhook processing failed");

                let already_errored = self
                    .tracker
                    .get(&run_id)
                    .is_some_and(|run| run.current_step == Step::Error);
                if !already_errored {
                    self.tracker
                        .transition(&run_id, Step::Error, RunData::with_error(&msg));
                }

                let entry = LogEntry::new(
                    LogEventType::WebhookError,
                    json!({ "error": msg, "webhookData": message }),
                    Some(run_id.clone()),
                );
                if let Err(log_err) = self.log.append(entry).await {
                    warn!(error = %log_err, "failed to record webhook error");
                }

                Err(err)
            }
        }
    }

    async fn process(
        &self,
        message: &InboundMessage,
        run_id: &RunId,
    ) -> Result<IngestOutcome, PipelineError> {
        // Duplicate guard: a live tracker entry means this id is mid-flight
        // from a concurrent call. Checked before any write so a rejected
        // request leaves no trace.
        if let Some(existing) = self.tracker.get(run_id) {
            if !existing.is_terminal() {
                return Err(PipelineError::DuplicateRun {
                    run_id: run_id.clone(),
                    current_step: existing.current_step,
                });
            }
        }

        info!("webhook received");
        self.tracker
            .transition(run_id, Step::Received, RunData::from_message(message));
        self.log
            .append(LogEntry::new(
                LogEventType::WebhookReceived,
                serde_json::to_value(message).map_err(EventLogError::from)?,
                Some(run_id.clone()),
            ))
            .await?;

        let ai_summary = self.summary_phase(message, run_id).await?;

        let notion_page_id = match &self.sink {
            Some(sink) => Some(
                self.notion_phase(sink.as_ref(), message, run_id, ai_summary.as_deref())
                    .await?,
            ),
            None => None,
        };

        self.tracker
            .transition(run_id, Step::Completed, RunData::default());
        self.log
            .append(LogEntry::new(
                LogEventType::WebhookProcessed,
                json!({
                    "message": if notion_page_id.is_some() {
                        "Notion에 저장되었습니다"
                    } else {
                        "잔디 웹훅 수신 완료 (Notion 연동 비활성화됨)"
                    },
                    "data": message,
                    "aiSummary": ai_summary,
                    "notionPageId": notion_page_id,
                }),
                Some(run_id.clone()),
            ))
            .await?;
        info!("webhook processing completed");

        Ok(IngestOutcome {
            webhook_id: run_id.clone(),
            ai_summary,
            notion_page_id,
            message: message.clone(),
        })
    }

    /// Summarization phase. Returns the usable summary, or `None` when the
    /// event has no text (skipped) or the gateway produced nothing usable.
    async fn summary_phase(
        &self,
        message: &InboundMessage,
        run_id: &RunId,
    ) -> Result<Option<String>, PipelineError> {
        let Some(text) = message.text() else {
            return Ok(None);
        };

        self.tracker
            .transition(run_id, Step::AiSummaryStart, RunData::default());
        info!("generating AI summary");

        match self.summarizer.summarize(text).await {
            Some(summary) if !is_failure_text(&summary) => {
                self.tracker.transition(
                    run_id,
                    Step::AiSummaryComplete,
                    RunData::with_summary(summary.clone()),
                );
                self.log
                    .append(LogEntry::new(
                        LogEventType::AiSummaryGenerated,
                        json!({
                            "originalText": text,
                            "summary": summary,
                            "author": message.user_name,
                            "room": message.room_name,
                        }),
                        Some(run_id.clone()),
                    ))
                    .await?;
                Ok(Some(summary))
            }
            returned => {
                // Null or the canned failure string: no usable summary for
                // the dashboard, though whatever came back is logged.
                warn!(returned = ?returned, "AI summary unavailable");
                self.tracker
                    .transition(run_id, Step::Error, RunData::with_error("AI 요약 생성 실패"));
                if self.policy == SummaryFailurePolicy::Abort {
                    return Err(PipelineError::Gateway("AI 요약 생성 실패".to_string()));
                }
                Ok(None)
            }
        }
    }

    async fn notion_phase(
        &self,
        sink: &dyn DocumentSink,
        message: &InboundMessage,
        run_id: &RunId,
        summary: Option<&str>,
    ) -> Result<String, PipelineError> {
        self.tracker
            .transition(run_id, Step::NotionSaveStart, RunData::default());
        self.log
            .append(LogEntry::new(
                LogEventType::NotionSaveStart,
                json!({
                    "message": "Notion 저장 시작",
                    "data": message,
                    "aiSummary": summary,
                }),
                Some(run_id.clone()),
            ))
            .await?;

        let page_id = sink
            .create_entry(message, summary)
            .await
            .map_err(|e| PipelineError::Unexpected(e.to_string()))?;

        self.tracker.transition(
            run_id,
            Step::NotionSaveComplete,
            RunData {
                notion_page_id: Some(page_id.clone()),
                ..RunData::default()
            },
        );
        self.log
            .append(LogEntry::new(
                LogEventType::NotionSaveComplete,
                json!({ "message": "Notion 저장 완료", "notionPageId": page_id }),
                Some(run_id.clone()),
            ))
            .await?;

        Ok(page_id)
    }
}
