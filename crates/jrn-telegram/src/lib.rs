//! Telegram adapter (teloxide).
//!
//! Implements the `jrn-core` MessagingPort over the Telegram Bot API:
//! HTML parse mode, link previews suppressed, one retry on rate limiting.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
};

use tokio::time::sleep;

use jrn_core::{
    config::Config,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{MessagingCapabilities, MessagingPort},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Option<Bot>,
}

impl TelegramMessenger {
    /// Build from configuration. A missing `BOT_TOKEN` is tolerated here:
    /// the send attempt fails with a config error instead, so the watcher
    /// keeps polling even when unconfigured.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            bot: cfg.bot_token.as_deref().map(Bot::new),
        }
    }

    pub fn new(bot: Bot) -> Self {
        Self { bot: Some(bot) }
    }

    fn recipient(chat_id: &ChatId) -> Result<Recipient> {
        let raw = chat_id.0.trim();
        if raw.is_empty() {
            return Err(Error::Config("CHAT_ID is not set".to_string()));
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Recipient::Id(teloxide::types::ChatId(n)));
        }
        Ok(Recipient::ChannelUsername(raw.to_string()))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: &ChatId, html: &str) -> Result<MessageRef> {
        let Some(bot) = &self.bot else {
            return Err(Error::Config("BOT_TOKEN is not set".to_string()));
        };
        let to = Self::recipient(chat_id)?;

        let msg = self
            .with_retry(|| {
                bot.send_message(to.clone(), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(MessageRef {
            chat_id: chat_id.clone(),
            message_id: MessageId(msg.id.0),
        })
    }
}
