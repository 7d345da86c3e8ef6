//! Notion document sink.
//!
//! Archives a processed message as a page in a Notion database: title from
//! the room and a text snippet, properties for author/room/team/date, the
//! original message as a paragraph, and the AI summary (when usable) as a
//! callout block.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::summarizer::is_failure_text;
use crate::domain::InboundMessage;

const NOTION_API_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";

/// Capability interface for the document store. Returns the created entry id.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn create_entry(
        &self,
        message: &InboundMessage,
        summary: Option<&str>,
    ) -> anyhow::Result<String>;
}

/// Notion pages API client.
pub struct NotionSink {
    api_key: String,
    database_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    id: String,
}

impl NotionSink {
    pub fn new(api_key: String, database_id: String) -> Self {
        Self {
            api_key,
            database_id,
            client: reqwest::Client::new(),
        }
    }

    fn page_payload(&self, message: &InboundMessage, summary: Option<&str>) -> serde_json::Value {
        let text = message.text.as_deref().unwrap_or("");
        let room = message.room_name.as_deref().unwrap_or("일반");

        let snippet: String = text.chars().take(50).collect();
        let ellipsis = if text.chars().count() > 50 { "..." } else { "" };

        let mut children = vec![serde_json::json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [{
                    "type": "text",
                    "text": { "content": format!("원본 메시지:\n{text}") }
                }]
            }
        })];

        if let Some(summary) = summary.filter(|s| !is_failure_text(s)) {
            children.push(serde_json::json!({
                "object": "block",
                "type": "callout",
                "callout": {
                    "icon": { "emoji": "🤖" },
                    "rich_text": [{
                        "type": "text",
                        "text": { "content": format!("AI 요약:\n{summary}") }
                    }],
                    "color": "blue_background"
                }
            }));
        }

        serde_json::json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "제목": {
                    "title": [{ "text": { "content": format!("[{room}] {snippet}{ellipsis}") } }]
                },
                "내용": {
                    "rich_text": [{ "text": { "content": text } }]
                },
                "작성자": {
                    "rich_text": [{
                        "text": { "content": message.user_name.as_deref().unwrap_or("알 수 없음") }
                    }]
                },
                "대화방": { "select": { "name": room } },
                "팀": { "select": { "name": message.team_name.as_deref().unwrap_or("기본팀") } },
                "작성일": {
                    "date": {
                        "start": message
                            .created_at
                            .clone()
                            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339())
                    }
                }
            },
            "children": children
        })
    }
}

#[async_trait]
impl DocumentSink for NotionSink {
    async fn create_entry(
        &self,
        message: &InboundMessage,
        summary: Option<&str>,
    ) -> anyhow::Result<String> {
        let payload = self.page_payload(message, summary);

        let response = self
            .client
            .post(NOTION_API_URL)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let page: PageResponse = response.json().await?;
        info!(page_id = %page.id, "Notion page created");
        Ok(page.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::summarizer::FAILURE_SUMMARY;

    fn sink() -> NotionSink {
        NotionSink::new("secret".into(), "db-id".into())
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            text: Some(text.to_string()),
            user_name: Some("kim".into()),
            room_name: Some("dev".into()),
            team_name: Some("toss".into()),
            created_at: Some("2024-05-01T09:00:00Z".into()),
            ..InboundMessage::default()
        }
    }

    #[test]
    fn test_title_truncates_long_text() {
        let long = "가".repeat(80);
        let payload = sink().page_payload(&message(&long), None);

        let title = payload["properties"]["제목"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert!(title.starts_with("[dev] "));
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), "[dev] ".chars().count() + 53);
    }

    #[test]
    fn test_summary_callout_included_when_usable() {
        let payload = sink().page_payload(&message("배포가 끝났습니다"), Some("배포 완료"));
        assert_eq!(payload["children"].as_array().unwrap().len(), 2);
        assert_eq!(payload["children"][1]["type"], "callout");
    }

    #[test]
    fn test_failure_summary_omitted() {
        let payload = sink().page_payload(&message("배포가 끝났습니다"), Some(FAILURE_SUMMARY));
        assert_eq!(payload["children"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let payload = sink().page_payload(&InboundMessage::default(), None);
        assert_eq!(
            payload["properties"]["작성자"]["rich_text"][0]["text"]["content"],
            "알 수 없음"
        );
        assert_eq!(payload["properties"]["대화방"]["select"]["name"], "일반");
        assert_eq!(payload["properties"]["팀"]["select"]["name"], "기본팀");
    }
}
