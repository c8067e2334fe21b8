pub mod format;
pub mod telegram;

use async_trait::async_trait;

use crate::error::Result;

pub use telegram::TelegramNotifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    /// Send with `parse_mode=HTML`.
    pub html: bool,
    pub disable_preview: bool,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            disable_preview: false,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            disable_preview: true,
        }
    }
}

/// Chat delivery. `send` returns the id of the new message so it can be
/// edited later.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, msg: &OutboundMessage) -> Result<i64>;
    async fn edit(&self, chat_id: i64, message_id: i64, msg: &OutboundMessage) -> Result<()>;
}
