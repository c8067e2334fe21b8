//! Telegram webhook payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// The subset of a Telegram `Update` the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// `(chat_id, url)` when the message text carries a link.
    pub fn link(&self) -> Option<(i64, &str)> {
        let msg = self.message.as_ref()?;
        let url = first_url(msg.text.as_deref()?)?;
        Some((msg.chat.id, url))
    }
}

pub fn first_url(text: &str) -> Option<&str> {
    RE_URL.find(text).map(|m| m.as_str())
}
