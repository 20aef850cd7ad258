// SPDX-License-Identifier: MIT
//! Telegram Bot API transport.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{BotError, ChatTransport, Update};

/// Long-poll window asked of the API; the HTTP timeout leaves headroom on
/// top of it.
const POLL_WINDOW_SECS: u64 = 25;
const HTTP_TIMEOUT: Duration = Duration::from_secs(40);

pub struct TelegramTransport {
    http: reqwest::Client,
    base_url: String,
    /// Next `getUpdates` offset (last seen update id + 1).
    offset: AtomicI64,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Result<Self, BotError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{token}"),
            offset: AtomicI64::new(0),
        })
    }
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self) -> Result<T, BotError> {
        if !self.ok {
            return Err(BotError::Api(
                self.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.result
            .ok_or_else(|| BotError::Malformed("ok response without result".into()))
    }
}

#[derive(Deserialize)]
struct WireUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    text: Option<String>,
    from: Option<WireUser>,
    chat: WireChat,
}

#[derive(Deserialize)]
struct WireUser {
    id: i64,
}

#[derive(Deserialize)]
struct WireChat {
    id: i64,
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, text: &str, chat_id: i64) -> Result<(), BotError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let envelope: ApiEnvelope<serde_json::Value> = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result().map(|_| ())
    }

    async fn poll_updates(&self) -> Result<Vec<Update>, BotError> {
        let offset = self.offset.load(Ordering::Acquire);
        let envelope: ApiEnvelope<Vec<WireUpdate>> = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[
                ("timeout", POLL_WINDOW_SECS.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let wire = envelope.into_result()?;
        let mut updates = Vec::with_capacity(wire.len());
        for item in wire {
            // Acknowledge everything we have seen, messages or not.
            let next = item.update_id + 1;
            self.offset.fetch_max(next, Ordering::AcqRel);

            let Some(message) = item.message else { continue };
            let Some(text) = message.text else { continue };
            let Some(from) = message.from else { continue };
            updates.push(Update {
                chat_id: message.chat.id,
                from_user_id: from.id,
                text,
            });
        }
        debug!(count = updates.len(), "polled chat updates");
        Ok(updates)
    }
}
