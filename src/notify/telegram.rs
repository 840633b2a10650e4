use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::emby::EmbyError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to fetch poster image: {0}")]
    Image(#[from] EmbyError),
}

/// Telegram Bot API client.
pub struct TelegramClient {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id)
    }

    /// Point the client at a different API host. Tests use this to swap in
    /// a local mock server.
    pub fn with_api_base(api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Send a plain text message.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(self.url("sendMessage"))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown"
            }))
            .send()
            .await?;

        check_status(resp).await
    }

    /// Send a photo with the message as its caption.
    ///
    /// The image is uploaded inline as a multipart part named `photo`, the
    /// way the Bot API expects local files.
    pub async fn send_photo(&self, photo: Bytes, caption: &str) -> Result<(), NotifyError> {
        let form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part(
                "photo",
                multipart::Part::bytes(photo.to_vec())
                    .file_name("photo.jpg")
                    .mime_str("image/jpeg")?,
            );

        let resp = self
            .client
            .post(self.url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), NotifyError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(NotifyError::Api { status, body });
    }
    Ok(())
}
