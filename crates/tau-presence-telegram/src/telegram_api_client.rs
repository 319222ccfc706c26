//! Telegram Bot API client used for presence signals, role lookups, replies, and polling.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tau_presence::{ConversationId, PresenceAction, PresenceTransport, PresenceTransportError};
use thiserror::Error;

use crate::presence_dispatch::ChatRoleLookup;

#[derive(Debug, Error)]
/// Enumerates supported `TelegramApiError` values.
pub enum TelegramApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram {method} failed with status {status}: {body}")]
    HttpStatus {
        method: String,
        status: u16,
        body: String,
    },
    #[error("telegram {method} failed: {description}")]
    Api { method: String, description: String },
    #[error("telegram {method} returned an invalid response: {detail}")]
    InvalidResponse { method: String, detail: String },
}

impl From<TelegramApiError> for PresenceTransportError {
    fn from(error: TelegramApiError) -> Self {
        match error {
            TelegramApiError::Http(error) => Self::Http(error.to_string()),
            TelegramApiError::HttpStatus { status, body, .. } => Self::Api {
                description: format!("status {status}: {body}"),
            },
            TelegramApiError::Api { description, .. } => Self::Api { description },
            TelegramApiError::InvalidResponse { detail, .. } => Self::Serde(detail),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponseEnvelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Subset of a Bot API `Update` the presence bot consumes.
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChatMember {
    status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates chat member statuses reported by `getChatMember`.
pub enum ChatMemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    Unknown,
}

impl ChatMemberRole {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "creator" => Self::Creator,
            "administrator" => Self::Administrator,
            "member" => Self::Member,
            "restricted" => Self::Restricted,
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            _ => Self::Unknown,
        }
    }

    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

#[derive(Clone)]
pub struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    request_timeout: Duration,
}

impl TelegramApiClient {
    pub fn new(api_base: &str, bot_token: &str, request_timeout_ms: u64) -> anyhow::Result<Self> {
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            anyhow::bail!("telegram api base cannot be empty");
        }
        let bot_token = bot_token.trim().to_string();
        if bot_token.is_empty() {
            anyhow::bail!("telegram bot token cannot be empty");
        }
        let http = reqwest::Client::builder()
            .user_agent("tau-presence-bot")
            .build()
            .context("failed to create telegram api client")?;
        Ok(Self {
            http,
            api_base,
            bot_token,
            request_timeout: Duration::from_millis(request_timeout_ms.max(1)),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Posts a Bot API method. `timeout: None` leaves the request unbounded.
    async fn call_method<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramApiError> {
        let mut request = self.http.post(self.method_url(method)).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope = match serde_json::from_str::<TelegramResponseEnvelope<T>>(&body) {
            Ok(envelope) => envelope,
            Err(error) => {
                if !status.is_success() {
                    return Err(TelegramApiError::HttpStatus {
                        method: method.to_string(),
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 240),
                    });
                }
                return Err(TelegramApiError::InvalidResponse {
                    method: method.to_string(),
                    detail: error.to_string(),
                });
            }
        };

        if !envelope.ok {
            return Err(TelegramApiError::Api {
                method: method.to_string(),
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("unknown error (status {})", status.as_u16())),
            });
        }
        envelope
            .result
            .ok_or_else(|| TelegramApiError::InvalidResponse {
                method: method.to_string(),
                detail: "response missing result".to_string(),
            })
    }

    /// Returns the bot's own username, used to recognize `/command@bot` mentions.
    pub async fn get_me(&self) -> Result<TelegramUser, TelegramApiError> {
        self.call_method("getMe", &json!({}), Some(self.request_timeout))
            .await
    }

    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<TelegramUpdate>, TelegramApiError> {
        let mut payload = json!({
            "timeout": timeout_seconds,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call_method("getUpdates", &payload, Some(self.request_timeout))
            .await
    }

    /// Sent without a request timeout; a stalled call only delays its own conversation.
    pub async fn send_chat_action(
        &self,
        chat_id: i64,
        action: PresenceAction,
    ) -> Result<(), TelegramApiError> {
        let _: bool = self
            .call_method(
                "sendChatAction",
                &json!({ "chat_id": chat_id, "action": action.as_wire_str() }),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramApiError> {
        let _: Value = self
            .call_method(
                "sendMessage",
                &json!({
                    "chat_id": chat_id,
                    "text": text,
                    "disable_web_page_preview": true,
                }),
                Some(self.request_timeout),
            )
            .await?;
        Ok(())
    }

    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMemberRole, TelegramApiError> {
        let member: TelegramChatMember = self
            .call_method(
                "getChatMember",
                &json!({ "chat_id": chat_id, "user_id": user_id }),
                Some(self.request_timeout),
            )
            .await?;
        Ok(ChatMemberRole::parse(&member.status))
    }
}

#[async_trait]
impl PresenceTransport for TelegramApiClient {
    async fn send_presence(
        &self,
        conversation_id: ConversationId,
        action: PresenceAction,
    ) -> Result<(), PresenceTransportError> {
        self.send_chat_action(conversation_id.0, action)
            .await
            .map_err(PresenceTransportError::from)
    }
}

#[async_trait]
impl ChatRoleLookup for TelegramApiClient {
    async fn chat_member_role(&self, chat_id: i64, user_id: i64) -> anyhow::Result<ChatMemberRole> {
        Ok(self.get_chat_member(chat_id, user_id).await?)
    }
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated = text.chars().take(max_chars).collect::<String>();
    format!("{truncated}...")
}
