//! Configuration for the relay.
//!
//! Everything comes from environment variables, matching the deployment
//! model: no config file, secrets injected by the platform. Missing
//! credentials degrade the matching integration to a no-op instead of
//! failing startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::summarizer::AiSettings;
use crate::core::event_log::DEFAULT_LOG_CAPACITY;
use crate::core::pipeline::SummaryFailurePolicy;
use crate::core::tracker::RunTracker;

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,

    /// OpenAI credential; `None` disables summarization.
    pub openai_api_key: Option<String>,

    /// Notion credential pair; both required to enable the document sink.
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,

    /// Shared token expected on inbound webhooks; `None` skips the check.
    pub jandi_webhook_token: Option<String>,

    /// Incoming-webhook URL for outbound messages.
    pub jandi_outgoing_webhook_url: Option<String>,

    /// Cap on retained event log entries.
    pub log_capacity: usize,

    /// How long terminal runs stay visible in the live tracker.
    pub retention_secs: i64,

    /// Whether a summarization failure fails the whole run.
    pub summary_failure_policy: SummaryFailurePolicy,

    /// SQLite path for the durable event log; unset means in-memory.
    pub event_log_path: Option<PathBuf>,

    /// Summarization tuning.
    pub ai: AiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            openai_api_key: None,
            notion_api_key: None,
            notion_database_id: None,
            jandi_webhook_token: None,
            jandi_outgoing_webhook_url: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            retention_secs: RunTracker::DEFAULT_RETENTION_SECS,
            summary_failure_policy: SummaryFailurePolicy::default(),
            event_log_path: None,
            ai: AiSettings::default(),
        }
    }
}

/// Read an env var, treating empty strings and the template placeholders
/// (`your_..._here`) left in sample .env files as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .filter(|v| !(v.starts_with("your_") && v.ends_with("_here")))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ai_defaults = AiSettings::default();

        Self {
            port: env_parse("PORT", defaults.port),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            notion_api_key: env_opt("NOTION_API_KEY"),
            notion_database_id: env_opt("NOTION_DATABASE_ID"),
            jandi_webhook_token: env_opt("JANDI_WEBHOOK_TOKEN"),
            jandi_outgoing_webhook_url: env_opt("JANDI_OUTGOING_WEBHOOK_URL"),
            log_capacity: env_parse("LOG_CAPACITY", defaults.log_capacity),
            retention_secs: env_parse("WEBHOOK_RETENTION_SECS", defaults.retention_secs),
            summary_failure_policy: env_parse(
                "SUMMARY_FAILURE_POLICY",
                defaults.summary_failure_policy,
            ),
            event_log_path: env_opt("EVENT_LOG_PATH").map(PathBuf::from),
            ai: AiSettings {
                model: env_opt("AI_MODEL").unwrap_or(ai_defaults.model),
                max_tokens: env_parse("AI_MAX_TOKENS", ai_defaults.max_tokens),
                temperature: env_parse("AI_TEMPERATURE", ai_defaults.temperature),
                min_text_length: env_parse("AI_MIN_TEXT_LENGTH", ai_defaults.min_text_length),
                timeout: Duration::from_secs(env_parse(
                    "AI_TIMEOUT_SECS",
                    ai_defaults.timeout.as_secs(),
                )),
            },
        }
    }

    /// True when the Notion document sink should be enabled.
    pub fn notion_enabled(&self) -> bool {
        self.notion_api_key.is_some() && self.notion_database_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_capacity, 100);
        assert_eq!(config.retention_secs, 300);
        assert_eq!(config.summary_failure_policy, SummaryFailurePolicy::Continue);
        assert!(!config.notion_enabled());
    }

    #[test]
    fn test_placeholder_values_count_as_unset() {
        std::env::set_var("TEST_PLACEHOLDER_KEY", "your_openai_api_key_here");
        assert!(env_opt("TEST_PLACEHOLDER_KEY").is_none());
        std::env::remove_var("TEST_PLACEHOLDER_KEY");
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        std::env::set_var("TEST_EMPTY_KEY", "");
        assert!(env_opt("TEST_EMPTY_KEY").is_none());
        std::env::remove_var("TEST_EMPTY_KEY");
    }

    #[test]
    fn test_notion_requires_both_credentials() {
        let config = Config {
            notion_api_key: Some("secret".into()),
            ..Config::default()
        };
        assert!(!config.notion_enabled());

        let config = Config {
            notion_api_key: Some("secret".into()),
            notion_database_id: Some("db".into()),
            ..Config::default()
        };
        assert!(config.notion_enabled());
    }
}
