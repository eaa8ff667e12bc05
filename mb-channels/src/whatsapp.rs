use crate::error::{Result, SendError};
use crate::traits::MessageSender;
use crate::types::{MessageId, OutboundContent, SendAck, SenderId};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v21.0";

#[derive(Clone)]
pub struct WhatsAppCloudAdapter {
    http: reqwest::Client,
    access_token: String,
    phone_number_id: String,
    api_base_url: String,
    api_version: String,
}

impl WhatsAppCloudAdapter {
    pub fn new(access_token: &str, phone_number_id: &str) -> Result<Self> {
        Self::with_timeout(access_token, phone_number_id, Duration::from_secs(60))
    }

    pub fn with_timeout(
        access_token: &str,
        phone_number_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(SendError::InvalidInput(
                "whatsapp access token is required".to_string(),
            ));
        }
        let phone_number_id = phone_number_id.trim();
        if phone_number_id.is_empty() {
            return Err(SendError::InvalidInput(
                "whatsapp phone number id is required".to_string(),
            ));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            access_token: access_token.to_string(),
            phone_number_id: phone_number_id.to_string(),
            api_base_url: DEFAULT_GRAPH_API_BASE_URL.to_string(),
            api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
        })
    }

    /// Point the adapter at a different Graph API host or version.
    pub fn with_api(mut self, base_url: &str, version: &str) -> Self {
        let base_url = base_url.trim().trim_end_matches('/');
        if !base_url.is_empty() {
            self.api_base_url = base_url.to_string();
        }
        let version = version.trim().trim_matches('/');
        if !version.is_empty() {
            self.api_version = version.to_string();
        }
        self
    }

    pub fn messages_url(&self) -> Result<Url> {
        Url::parse(&format!(
            "{}/{}/{}/messages",
            self.api_base_url, self.api_version, self.phone_number_id
        ))
        .map_err(|e| SendError::InvalidInput(format!("invalid whatsapp graph API URL: {e}")))
    }
}

#[async_trait::async_trait]
impl MessageSender for WhatsAppCloudAdapter {
    fn channel_id(&self) -> &str {
        "whatsapp"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(to = %to, kind = content.kind()))]
    async fn send(&self, to: &SenderId, content: OutboundContent) -> Result<SendAck> {
        let to = to.trim();
        if to.is_empty() {
            return Err(SendError::InvalidInput(
                "recipient (E.164 phone number) is required".to_string(),
            ));
        }

        let url = self.messages_url()?;
        let payload = build_message_payload(to, &content)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let ack = parse_send_ack(&body)?;
        tracing::debug!(message_id = ?ack.message_id, "whatsapp message accepted");
        Ok(ack)
    }
}

/// Build the Graph API `messages` request body for one outbound message.
pub fn build_message_payload(to: &str, content: &OutboundContent) -> Result<serde_json::Value> {
    match content {
        OutboundContent::Text { body } => {
            if body.trim().is_empty() {
                return Err(SendError::InvalidInput("message body is empty".to_string()));
            }
            Ok(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "text": { "body": body },
            }))
        }
        OutboundContent::InteractiveMenu { body, buttons } => {
            // The platform accepts between one and three reply buttons.
            if buttons.is_empty() || buttons.len() > 3 {
                return Err(SendError::InvalidInput(format!(
                    "interactive menu needs 1-3 buttons, got {}",
                    buttons.len()
                )));
            }
            let buttons: Vec<serde_json::Value> = buttons
                .iter()
                .map(|button| {
                    serde_json::json!({
                        "type": "reply",
                        "reply": { "id": button.id, "title": button.title },
                    })
                })
                .collect();
            Ok(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "interactive",
                "interactive": {
                    "type": "button",
                    "body": { "text": body },
                    "action": { "buttons": buttons },
                },
            }))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SendResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct SendResponseMessage {
    #[serde(default)]
    id: String,
}

fn parse_send_ack(body: &str) -> Result<SendAck> {
    if body.trim().is_empty() {
        return Ok(SendAck::default());
    }
    let response: SendResponse = serde_json::from_str(body)?;
    let message_id = response
        .messages
        .into_iter()
        .map(|message| message.id)
        .find(|id| !id.trim().is_empty())
        .map(MessageId::from);
    Ok(SendAck { message_id })
}
