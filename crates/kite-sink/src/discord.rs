//! Discord REST implementation of the message sink.

use crate::error::{SinkError, SinkResult};
use crate::{MessageHandle, MessageSink, SinkMessage, MESSAGE_LIMIT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    author: AuthorResponse,
    timestamp: DateTime<Utc>,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AuthorResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

/// Bot-token authenticated Discord client.
pub struct DiscordSink {
    client: Client,
    api_base: String,
    bot_token: String,
    /// Cached `/users/@me` id.
    self_id: RwLock<Option<String>>,
}

impl DiscordSink {
    pub fn new(bot_token: impl Into<String>) -> SinkResult<Self> {
        Self::with_api_base(bot_token, API_BASE)
    }

    /// Point at a different API base (tests).
    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> SinkResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            self_id: RwLock::new(None),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    fn check_len(text: &str) -> SinkResult<()> {
        let len = text.chars().count();
        if len > MESSAGE_LIMIT {
            return Err(SinkError::TooLarge(len));
        }
        Ok(())
    }

    async fn into_api_error(response: reqwest::Response) -> SinkError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 404 {
            SinkError::NotFound(body)
        } else {
            SinkError::Api { status, body }
        }
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send(&self, channel_id: &str, text: &str) -> SinkResult<MessageHandle> {
        Self::check_len(text)?;

        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&CreateMessage { content: text })
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        debug!(channel_id, message_id = %message.id, "Message sent");
        Ok(MessageHandle::new(message.id))
    }

    async fn edit(&self, channel_id: &str, handle: &MessageHandle, text: &str) -> SinkResult<()> {
        Self::check_len(text)?;

        let url = format!(
            "{}/channels/{channel_id}/messages/{}",
            self.api_base, handle.0
        );
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .json(&CreateMessage { content: text })
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }

        debug!(channel_id, message_id = %handle.0, "Message edited");
        Ok(())
    }

    async fn fetch_recent(&self, channel_id: &str, limit: usize) -> SinkResult<Vec<SinkMessage>> {
        let url = format!(
            "{}/channels/{channel_id}/messages?limit={limit}",
            self.api_base
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }

        let messages: Vec<MessageResponse> = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        Ok(messages
            .into_iter()
            .map(|m| SinkMessage {
                handle: MessageHandle::new(m.id),
                author_id: m.author.id,
                created_at: m.timestamp,
                text: m.content,
            })
            .collect())
    }

    async fn self_id(&self) -> SinkResult<String> {
        if let Some(id) = self.self_id.read().clone() {
            return Ok(id);
        }

        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        *self.self_id.write() = Some(user.id.clone());
        Ok(user.id)
    }
}
