//! Chat message texts.

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::OutboundMessage;
use crate::model::Category;

pub fn processing(url: &str) -> OutboundMessage {
    OutboundMessage::plain(format!("⏳ 正在处理: {url}"))
}

pub fn failure(message: &str) -> OutboundMessage {
    OutboundMessage::plain(format!("❌ Error: {message}"))
}

/// Everything the success message shows.
#[derive(Debug, Clone)]
pub struct SavedView<'a> {
    pub title: &'a str,
    pub category: Category,
    pub tags: &'a [String],
    pub summary: &'a str,
    pub insight: &'a str,
    /// Archive page when publishing succeeded, otherwise the source URL.
    pub link: &'a str,
    pub app_url: &'a str,
}

pub fn success(v: &SavedView<'_>) -> OutboundMessage {
    let tags = v
        .tags
        .iter()
        .map(|t| format!("#{}", encode_text(t)))
        .collect::<Vec<_>>()
        .join(" ");
    let lines = [
        "✅ <b>已保存!</b>".to_string(),
        String::new(),
        format!("<b>{}</b>", encode_text(v.title)),
        format!("<i>{}</i>  {}", v.category, tags),
        String::new(),
        "📝 <b>摘要：</b>".to_string(),
        encode_text(v.summary).into_owned(),
        String::new(),
        "💡 <b>AI 洞见：</b>".to_string(),
        encode_text(v.insight).into_owned(),
        String::new(),
        format!(
            "<a href=\"{}\">🔗 原文</a>  |  <a href=\"{}\">🌌 知识库</a>",
            encode_double_quoted_attribute(v.link),
            encode_double_quoted_attribute(v.app_url)
        ),
    ];
    OutboundMessage::html(lines.join("\n"))
}
