//! Prompt templates and parsing of model replies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{InsightRequest, Summary, SummaryRequest};
use crate::error::{Result, ServiceError};
use crate::model::{Category, Entry};

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\n?|\n?```").expect("fence regex"));

/// Cut `s` to at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn context_lines(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "（无）".to_string();
    }
    entries
        .iter()
        .map(|e| format!("- [{}] {}: {}", e.category, e.title, truncate_chars(&e.summary, 300)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary_prompt(req: &SummaryRequest<'_>, max_chars: usize) -> String {
    format!(
        r#"You are an expert content curator. Analyze the following markdown content from the URL: {url}
Article title: {title}

Recent Context (the last few articles I saved):
{context}

If the new content relates to any of them (supports, contradicts, updates, or complements), mention it in the summary.

Output a JSON object with:
- summary: A deep, insightful summary in Chinese (Simplified). Extract key insights and value propositions, not a recap. A short paragraph followed by 3 bullet points of key takeaways.
- tags: An array of 3-5 relevant tags (strings, no #).
- category: One of ["Tech", "News", "Design", "Tutorial", "Other"].

Content:
{content}"#,
        url = req.url,
        title = req.title,
        context = context_lines(req.context),
        content = truncate_chars(req.markdown, max_chars),
    )
}

pub fn insight_prompt(req: &InsightRequest<'_>) -> String {
    format!(
        r#"你是我的个人知识库助手。我刚保存了一篇文章：

标题：{title}
链接：{url}
摘要：{summary}

知识库中与它标签相关的已保存文章：
{related}

请用中文写 2-3 句简短的洞见：这篇文章的独特价值是什么，它与已保存的文章有什么联系（补充、矛盾或延伸）。没有相关文章时只谈文章本身。只输出洞见正文，不要标题或列表。"#,
        title = req.title,
        url = req.url,
        summary = req.summary,
        related = context_lines(req.related),
    )
}

/// Remove Markdown code fences some models wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    RE_FENCE.replace_all(raw, "").trim().to_string()
}

#[derive(Deserialize)]
struct SummaryPayload {
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parse the summary reply. Anything that is not the expected JSON object
/// is an error; there is no silent default.
pub fn parse_summary(raw: &str) -> Result<Summary> {
    let cleaned = strip_code_fences(raw);
    let payload: SummaryPayload = serde_json::from_str(&cleaned)
        .map_err(|e| ServiceError::MalformedResponse(format!("summary is not valid JSON: {e}")))?;
    let summary = payload.summary.trim().to_string();
    if summary.is_empty() {
        return Err(ServiceError::MalformedResponse("empty summary".to_string()));
    }
    Ok(Summary {
        summary,
        tags: clean_tags(payload.tags),
        category: payload.category.and_then(|c| c.parse::<Category>().ok()),
    })
}

/// Trim, drop leading `#`, drop empties and duplicates (first wins).
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        let t = t.trim().trim_start_matches('#').trim().to_string();
        if t.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(&t)) {
            continue;
        }
        out.push(t);
    }
    out
}
