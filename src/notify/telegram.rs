use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Notifier, OutboundMessage};
use crate::config::TelegramConfig;
use crate::error::{Result, ServiceError};

/// Telegram Bot API (`sendMessage` / `editMessageText`).
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<i64>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_preview_options: Option<LinkPreviewOptions>,
}

impl<'a> MessageBody<'a> {
    fn new(chat_id: i64, message_id: Option<i64>, msg: &'a OutboundMessage) -> Self {
        Self {
            chat_id,
            message_id,
            text: &msg.text,
            parse_mode: msg.html.then_some("HTML"),
            link_preview_options: msg
                .disable_preview
                .then_some(LinkPreviewOptions { is_disabled: true }),
        }
    }
}

#[derive(Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            bot_token: cfg.bot_token.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &MessageBody<'_>,
    ) -> anyhow::Result<T> {
        let rsp = self
            .client
            .post(format!("{}/bot{}/{}", self.api_base, self.bot_token, method))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token
            .map_err(|e| anyhow!("telegram {method} request failed: {}", e.without_url()))?;
        let status = rsp.status();
        let parsed: BotResponse<T> = rsp
            .json()
            .await
            .with_context(|| format!("telegram {method} HTTP {status}: unreadable body"))?;
        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(anyhow!(
                "telegram {method} HTTP {status}: {}",
                parsed.description.unwrap_or_else(|| "no description".to_string())
            )),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, msg: &OutboundMessage) -> Result<i64> {
        let sent: SentMessage = self
            .call("sendMessage", &MessageBody::new(chat_id, None, msg))
            .await
            .map_err(|e| ServiceError::from_anyhow(ServiceError::Notify, e))?;
        Ok(sent.message_id)
    }

    async fn edit(&self, chat_id: i64, message_id: i64, msg: &OutboundMessage) -> Result<()> {
        // result is the edited Message, or `true` for inline messages
        self.call::<serde_json::Value>(
            "editMessageText",
            &MessageBody::new(chat_id, Some(message_id), msg),
        )
        .await
        .map_err(|e| ServiceError::from_anyhow(ServiceError::Notify, e))?;
        Ok(())
    }
}
