//! Telegram Bot API transport — getUpdates and sendMessage over reqwest.
//!
//! The relay loop only talks to the [`Transport`] trait, so tests can swap
//! in a scripted double. Fetch failures of every flavor (network, non-2xx,
//! unparseable body) collapse to `None`: the caller never needs to tell a
//! network outage apart from "no updates". Send failures stay distinct —
//! the loop decides what to do with them.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

use crate::error::TransportError;

/// Response envelope of `getUpdates`.
///
/// Every field is optional-tolerant: a payload that deserializes but is
/// missing pieces is a valid "nothing usable here" batch, never an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatesResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Vec<Update>>,
}

/// One update envelope. Only message-kind updates carry a `message`;
/// everything else (edits, callbacks, ...) leaves it `None` and is skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

/// The message sub-record of an update.
#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chat: Option<TgChat>,
    /// Unix timestamp. Telegram's resolution is one second, so several
    /// messages may share a value.
    #[serde(default)]
    pub date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    #[serde(default)]
    pub id: Option<i64>,
}

/// Blocking-style request/response operations against the messaging API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Poll for new updates. `None` covers connection failure, non-success
    /// status, and malformed bodies alike.
    async fn fetch_updates(&self) -> Option<UpdatesResponse>;

    /// Echo `text` back to `chat_id`.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;
}

/// Live Bot API client.
pub struct BotApi {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl BotApi {
    pub fn new(bot_token: SecretString, request_timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { bot_token, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl Transport for BotApi {
    async fn fetch_updates(&self) -> Option<UpdatesResponse> {
        let resp = match self.client.get(self.api_url("getUpdates")).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("getUpdates request failed: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "getUpdates returned non-success status");
            return None;
        }

        match resp.json::<UpdatesResponse>().await {
            Ok(batch) => Some(batch),
            Err(e) => {
                warn!("getUpdates body failed to parse: {e}");
                None
            }
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        Ok(())
    }
}
