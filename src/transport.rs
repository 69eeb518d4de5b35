use crate::config::TelegramConfig;
use crate::error::{Result, SentryError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Delivery channel for notification text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `text` to the configured destination.
    ///
    /// # Errors
    ///
    /// Returns `SentryError::Transport` when delivery fails
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Payload for the Bot API `sendMessage` method.
#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends messages to a Telegram chat through the Bot API.
///
/// Missing credentials are not a startup error: every send simply fails,
/// which leaves the debouncer free to retry once credentials exist.
pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramTransport {
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: config.api_base.clone(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn endpoint(&self, bot_token: &str) -> Result<Url> {
        let base = Url::parse(&self.api_base)
            .map_err(|e| SentryError::Transport(format!("Invalid API base URL: {e}")))?;
        // Leading "./" keeps the "bot<id>:<secret>" segment from parsing as a scheme
        base.join(&format!("./bot{bot_token}/sendMessage"))
            .map_err(|e| SentryError::Transport(format!("Invalid API endpoint: {e}")))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        let (Some(bot_token), Some(chat_id)) = (self.bot_token.as_deref(), self.chat_id.as_deref())
        else {
            return Err(SentryError::Transport(
                "Telegram bot token or chat id is not configured".to_string(),
            ));
        };

        let endpoint = self.endpoint(bot_token)?;
        debug!("Sending Telegram message to chat {chat_id}");

        let response = self
            .client
            .post(endpoint)
            .json(&SendMessagePayload { chat_id, text })
            .send()
            .await
            .map_err(|err| SentryError::Transport(format!("Failed to send message: {err}")))?;

        response.error_for_status().map(|_| ()).map_err(|err| {
            SentryError::Transport(format!("Telegram responded with error status: {err}"))
        })
    }
}
