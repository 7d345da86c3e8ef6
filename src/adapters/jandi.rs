//! Outbound connect-message sender for Jandi.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request body accepted by the relay's send endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutboundMessage {
    pub body: Option<String>,
    pub connect_color: Option<String>,
    pub connect_info: Option<String>,
}

/// Payload shape the Jandi incoming-webhook API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JandiMessage {
    pub body: String,
    pub connect_color: String,
    pub connect_info: Vec<String>,
}

/// What was sent and how the webhook responded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReport {
    pub status: u16,
    pub sent_data: JandiMessage,
}

/// Client for a Jandi incoming webhook URL.
pub struct JandiClient {
    webhook_url: String,
    client: reqwest::Client,
}

impl JandiClient {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    /// Post a connect message. Defaults mirror the service's conventions:
    /// yellow accent color, empty info list.
    pub async fn send(&self, message: OutboundMessage) -> Result<SendReport> {
        let payload = JandiMessage {
            body: message
                .body
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| "메시지 내용이 없습니다".to_string()),
            connect_color: message
                .connect_color
                .unwrap_or_else(|| "#FAC11B".to_string()),
            connect_info: message.connect_info.into_iter().collect(),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("failed to post message to Jandi")?;

        let status = response.status().as_u16();
        info!(status, "message relayed to Jandi");

        Ok(SendReport {
            status,
            sent_data: payload,
        })
    }
}
