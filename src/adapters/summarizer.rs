//! AI summarization gateway.
//!
//! Wraps the OpenAI chat completions API behind a narrow capability: text in,
//! summary out. Missing credentials, too-short input, and upstream failures
//! are all resolved locally into sentinel returns; nothing propagates past
//! this boundary.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

/// Canned response for input below the minimum length. A policy answer, not
/// a failure: callers treat it as a usable summary.
pub const TOO_SHORT_SUMMARY: &str = "요약할 내용이 너무 짧습니다.";

/// Canned response when the upstream call errors or times out.
pub const FAILURE_SUMMARY: &str = "요약 생성에 실패했습니다.";

/// True if `summary` is the canned upstream-failure string. Such a summary is
/// still logged as returned, but counts as "no usable summary" for the
/// pipeline and dashboard.
pub fn is_failure_text(summary: &str) -> bool {
    summary == FAILURE_SUMMARY
}

/// Capability interface: text in, summary (or nothing) out.
///
/// `None` means no credential is configured; a canned string means the input
/// was too short or the upstream call failed.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Option<String>;
}

/// Tuning knobs for the AI call, mirroring the service's deployment config.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub min_text_length: usize,
    pub timeout: Duration,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.3,
            min_text_length: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// OpenAI-backed summarizer.
pub struct AiSummarizer {
    api_key: Option<String>,
    settings: AiSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl AiSummarizer {
    pub fn new(api_key: Option<String>, settings: AiSettings) -> Self {
        Self {
            api_key,
            settings,
            client: reqwest::Client::new(),
        }
    }

    async fn request(&self, api_key: &str, text: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {
                    "role": "system",
                    "content": "당신은 한국어 텍스트를 간결하게 요약하는 AI입니다. 핵심 내용을 1-2문장으로 요약해주세요."
                },
                {
                    "role": "user",
                    "content": format!("다음 텍스트를 요약해주세요:\n\n{text}")
                }
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .timeout(self.settings.timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("empty choices in completion response"))?;

        Ok(content)
    }
}

#[async_trait]
impl Summarizer for AiSummarizer {
    async fn summarize(&self, text: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("AI API key not configured, skipping summarization");
            return None;
        };

        if text.trim().chars().count() < self.settings.min_text_length {
            debug!("text below minimum length, returning canned response");
            return Some(TOO_SHORT_SUMMARY.to_string());
        }

        match self.request(api_key, text).await {
            Ok(summary) => Some(summary.trim().to_string()),
            Err(e) => {
                error!(error = %e, "AI summarization failed");
                Some(FAILURE_SUMMARY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_api_key_returns_none() {
        let summarizer = AiSummarizer::new(None, AiSettings::default());
        let result = summarizer.summarize("충분히 긴 요약 대상 텍스트입니다").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_short_text_returns_canned_response() {
        let summarizer = AiSummarizer::new(Some("sk-test".into()), AiSettings::default());
        let result = summarizer.summarize("짧음").await;
        assert_eq!(result.as_deref(), Some(TOO_SHORT_SUMMARY));
    }

    #[test]
    fn test_failure_text_detection() {
        assert!(is_failure_text(FAILURE_SUMMARY));
        assert!(!is_failure_text(TOO_SHORT_SUMMARY));
        assert!(!is_failure_text("정상 요약"));
    }
}
