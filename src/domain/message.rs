//! Inbound webhook payload from Jandi.

use serde::{Deserialize, Serialize};

/// Body of an outgoing-webhook POST from Jandi.
///
/// All fields are optional; Jandi includes a shared `token` when one is
/// configured on the connect integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundMessage {
    pub token: Option<String>,
    pub text: Option<String>,
    pub user_name: Option<String>,
    pub room_name: Option<String>,
    pub team_name: Option<String>,
    pub created_at: Option<String>,
}

impl InboundMessage {
    /// The message text, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_jandi_body() {
        let body = serde_json::json!({
            "token": "shared-secret",
            "teamName": "toss",
            "roomName": "dev",
            "userName": "kim",
            "text": "배포 완료했습니다",
            "createdAt": "2024-05-01T09:00:00Z"
        });
        let message: InboundMessage = serde_json::from_value(body).unwrap();
        assert_eq!(message.text(), Some("배포 완료했습니다"));
        assert_eq!(message.room_name.as_deref(), Some("dev"));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let message = InboundMessage {
            text: Some(String::new()),
            ..InboundMessage::default()
        };
        assert!(message.text().is_none());
    }
}
