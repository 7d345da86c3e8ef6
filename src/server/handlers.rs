//! Request handlers.
//!
//! Response bodies keep the service's original wire shapes: `success` flag,
//! camelCase keys, Korean user-facing messages.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::adapters::jandi::OutboundMessage;
use crate::core::PipelineError;
use crate::domain::{InboundMessage, RunId};

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /webhook/jandi` -- ingest one inbound Jandi webhook.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(message): Json<InboundMessage>,
) -> impl IntoResponse {
    if let Some(expected) = &state.webhook_token {
        if message.token.as_deref() != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "유효하지 않은 토큰입니다" })),
            );
        }
    }

    let run_id = RunId::generate();
    match state.pipeline.ingest(message, run_id).await {
        Ok(outcome) => {
            let message_text = if outcome.notion_page_id.is_some() {
                "Notion에 저장되었습니다"
            } else {
                "잔디 웹훅 데이터를 성공적으로 수신했습니다"
            };
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": message_text,
                    "webhookId": outcome.webhook_id,
                    "aiSummary": outcome.ai_summary,
                    "notionPageId": outcome.notion_page_id,
                    "data": outcome.message,
                })),
            )
        }
        Err(err) => error_response(&err),
    }
}

/// `GET /admin/webhooks` -- dashboard projection.
pub async fn webhook_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.projector.project().await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryRequest {
    webhook_id: Option<String>,
}

/// `POST /admin/retry-ai-summary` -- regenerate the summary for a finished run.
pub async fn retry_ai_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetryRequest>,
) -> impl IntoResponse {
    let Some(webhook_id) = request.webhook_id.filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "webhookId가 필요합니다" })),
        );
    };

    match state.retry.retry(&RunId::new(webhook_id)).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "AI 요약이 성공적으로 재생성되었습니다",
                "webhookId": outcome.webhook_id,
                "newSummary": outcome.new_summary,
                "originalText": outcome.original_text,
            })),
        ),
        Err(err) => error_response(&err),
    }
}

/// `GET /logs` -- retained log entries, most recent first.
pub async fn recent_logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.log.all().await {
        Ok(mut entries) => {
            entries.reverse();
            (StatusCode::OK, Json(json!(entries)))
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        ),
    }
}

/// `POST /send-message` -- relay a message to the configured Jandi webhook.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<OutboundMessage>,
) -> impl IntoResponse {
    let Some(jandi) = &state.jandi else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "잔디 웹훅 URL이 설정되지 않았습니다" })),
        );
    };

    match jandi.send(message).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": report.status,
                "sentData": report.sent_data,
            })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        ),
    }
}

/// Map a pipeline error to its HTTP response. Conflicts carry the step the
/// run is currently in so callers can see what it is doing.
fn error_response(err: &PipelineError) -> (StatusCode, Json<serde_json::Value>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut body = json!({ "success": false, "error": err.to_string() });
    if let PipelineError::DuplicateRun { current_step, .. }
    | PipelineError::StillProcessing { current_step, .. } = err
    {
        body["currentStep"] = json!(current_step);
    }

    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Step;

    #[test]
    fn test_conflict_response_carries_current_step() {
        let err = PipelineError::DuplicateRun {
            run_id: RunId::new("webhook_1_aaaa"),
            current_step: Step::AiSummaryStart,
        };
        let (status, Json(body)) = error_response(&err);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["currentStep"], "ai_summary_start");
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_not_found_response() {
        let err = PipelineError::RunNotFound(RunId::new("webhook_1_bbbb"));
        let (status, Json(body)) = error_response(&err);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("currentStep").is_none());
    }
}
