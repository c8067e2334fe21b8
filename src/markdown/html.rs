//! Best-effort mapping of raw HTML fragments found in Markdown.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Node, Tag};

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").expect("tag strip regex"));
static RE_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="([^"]+)""#).expect("src regex"));

/// Remove everything that looks like a tag.
pub fn strip_tags(html: &str) -> String {
    RE_TAGS.replace_all(html, "").into_owned()
}

/// Map an HTML fragment to at most one node.
///
/// Media tags with a quoted `src` become `img`/`video`/`iframe`; fragments
/// containing bold or italic tags become `b`/`i` around their text; anything
/// else is reduced to its text, or dropped when nothing is left.
pub fn to_node(raw: &str) -> Option<Node> {
    let html = raw.trim();

    for (prefix, tag) in [("<img", Tag::Img), ("<video", Tag::Video), ("<iframe", Tag::Iframe)] {
        if html.starts_with(prefix) {
            if let Some(caps) = RE_SRC.captures(html) {
                return Some(Node::media(tag, &caps[1]));
            }
        }
    }

    let text = strip_tags(html).trim().to_string();
    if text.is_empty() {
        return None;
    }
    if html.contains("<b>") || html.contains("<strong>") {
        return Some(Node::element(Tag::B, vec![Node::text(text)]));
    }
    if html.contains("<i>") || html.contains("<em>") {
        return Some(Node::element(Tag::I, vec![Node::text(text)]));
    }
    Some(Node::text(text))
}
