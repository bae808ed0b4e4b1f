//! Cross-messenger port.
//!
//! Telegram is the only implementation today; the shape leaves room for other
//! messengers behind capability flags.

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub max_message_len: usize,
}

#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Deliver one HTML-formatted message.
    ///
    /// Implementations must fail with `Error::Config` when credentials are
    /// missing, without attempting any network call.
    async fn send_html(&self, chat_id: &ChatId, html: &str) -> Result<MessageRef>;
}
