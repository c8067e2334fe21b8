//! Markdown to Telegra.ph node conversion.
//!
//! [`to_nodes`] lexes Markdown into [`token::Token`]s, maps every token to
//! zero or more [`Node`]s and finally groups stray inline nodes into
//! paragraphs, so the top level only ever holds block elements. Conversion
//! never fails: constructs without a mapping degrade to text or disappear.

pub mod html;
pub mod table;
pub mod token;

use crate::node::{Node, Tag};
use token::{ListItem, Token};

/// Convert Markdown into a sequence of top-level block nodes.
pub fn to_nodes(markdown: &str) -> Vec<Node> {
    let tokens = token::lex(markdown);
    let raw: Vec<Node> = tokens.iter().flat_map(convert).collect();
    group_inline(raw)
}

/// Map a single token to a flat run of nodes.
pub fn convert(token: &Token) -> Vec<Node> {
    match token {
        Token::Text(s) => vec![Node::text(s.clone())],
        Token::Strong(c) => vec![Node::element(Tag::B, convert_all(c))],
        Token::Emphasis(c) => vec![Node::element(Tag::I, convert_all(c))],
        Token::Strikethrough(c) => vec![Node::element(Tag::S, convert_all(c))],
        Token::Code(s) => vec![Node::element(Tag::Code, vec![Node::text(s.clone())])],
        Token::Link { href, children } => vec![Node::link(href.clone(), convert_all(children))],
        Token::Image { src, alt, title } => vec![image(src, alt, title.as_deref())],
        Token::LineBreak => vec![Node::empty(Tag::Br)],
        Token::Rule => vec![Node::empty(Tag::Hr)],
        Token::Paragraph(c) => vec![Node::element(Tag::P, convert_all(c))],
        Token::Heading { level, children } => {
            let tag = if *level <= 2 { Tag::H3 } else { Tag::H4 };
            vec![Node::element(tag, convert_all(children))]
        }
        Token::List { ordered, items } => {
            let tag = if *ordered { Tag::Ol } else { Tag::Ul };
            vec![Node::element(tag, items.iter().map(list_item).collect())]
        }
        Token::BlockQuote(c) => vec![blockquote(convert_all(c))],
        Token::CodeBlock { text, .. } => vec![preformatted(text.clone())],
        Token::Table(t) => vec![preformatted(table::render_ascii(t))],
        Token::Html(raw) => html::to_node(raw).into_iter().collect(),
        Token::Unknown(text) => text.iter().map(|t| Node::text(t.clone())).collect(),
    }
}

fn convert_all(tokens: &[Token]) -> Vec<Node> {
    tokens.iter().flat_map(convert).collect()
}

fn image(src: &str, alt: &str, title: Option<&str>) -> Node {
    let img = Node::media(Tag::Img, src);
    let caption = title.filter(|t| !t.is_empty()).unwrap_or(alt);
    if caption.is_empty() {
        return img;
    }
    Node::element(
        Tag::Figure,
        vec![img, Node::element(Tag::Figcaption, vec![Node::text(caption)])],
    )
}

fn preformatted(text: String) -> Node {
    Node::element(
        Tag::Pre,
        vec![Node::element(Tag::Code, vec![Node::text(text)])],
    )
}

fn list_item(item: &ListItem) -> Node {
    let mut children = Vec::new();
    if let Some(checked) = item.task {
        children.push(Node::text(if checked { "[x] " } else { "[ ] " }));
    }
    children.extend(convert_all(&item.children));
    Node::element(Tag::Li, unwrap_paragraphs(children))
}

/// Replace every direct `p` child by its own children.
fn unwrap_paragraphs(children: Vec<Node>) -> Vec<Node> {
    children
        .into_iter()
        .flat_map(|child| {
            if child.is_tag(Tag::P) {
                child.into_children()
            } else {
                vec![child]
            }
        })
        .collect()
}

fn blockquote(children: Vec<Node>) -> Node {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if child.is_tag(Tag::P) {
            out.extend(child.into_children());
            out.push(Node::empty(Tag::Br));
        } else {
            out.push(child);
        }
    }
    if out.last().is_some_and(|n| n.is_tag(Tag::Br)) {
        out.pop();
    }
    Node::element(Tag::Blockquote, out)
}

/// Flush runs of non-block nodes into paragraphs.
pub fn group_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut buffer: Vec<Node> = Vec::new();
    for node in nodes {
        if node.is_block() {
            if !buffer.is_empty() {
                out.push(Node::element(Tag::P, std::mem::take(&mut buffer)));
            }
            out.push(node);
        } else {
            buffer.push(node);
        }
    }
    if !buffer.is_empty() {
        out.push(Node::element(Tag::P, buffer));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(children: Vec<Node>) -> Node {
        Node::element(Tag::P, children)
    }

    #[test]
    fn heading_levels_collapse_to_two() {
        let nodes = to_nodes("# One\n\n## Two\n\n### Three\n\n###### Six");
        let tags: Vec<_> = nodes.iter().filter_map(Node::tag).collect();
        assert_eq!(tags, vec![Tag::H3, Tag::H3, Tag::H4, Tag::H4]);
    }

    #[test]
    fn image_with_alt_becomes_figure() {
        let nodes = to_nodes("![A cat](https://x.test/cat.png)");
        let figure = &nodes[0].children()[0];
        assert!(figure.is_tag(Tag::Figure));
        assert_eq!(figure.children()[0].attr_src(), Some("https://x.test/cat.png"));
        assert_eq!(
            figure.children()[1],
            Node::element(Tag::Figcaption, vec![Node::text("A cat")])
        );
    }

    #[test]
    fn image_title_wins_over_alt() {
        let node = image("u", "alt", Some("title"));
        assert_eq!(
            node.children()[1],
            Node::element(Tag::Figcaption, vec![Node::text("title")])
        );
    }

    #[test]
    fn bare_image_without_caption() {
        let nodes = to_nodes("![](https://x.test/a.png)");
        assert_eq!(nodes, vec![p(vec![Node::media(Tag::Img, "https://x.test/a.png")])]);
    }

    #[test]
    fn link_keeps_href_and_label() {
        let nodes = to_nodes("[docs](https://docs.rs)");
        assert_eq!(
            nodes,
            vec![p(vec![Node::link("https://docs.rs", vec![Node::text("docs")])])]
        );
    }

    #[test]
    fn hard_break_is_preserved_inside_paragraph() {
        let nodes = to_nodes("first  \nsecond");
        assert_eq!(
            nodes,
            vec![p(vec![
                Node::text("first"),
                Node::empty(Tag::Br),
                Node::text("second"),
            ])]
        );
    }

    #[test]
    fn inline_br_survives_in_paragraph() {
        assert_eq!(
            to_nodes("a <br> b"),
            vec![p(vec![
                Node::text("a "),
                Node::empty(Tag::Br),
                Node::text(" b"),
            ])]
        );
    }

    #[test]
    fn blockquote_paragraphs_are_joined_with_breaks() {
        let nodes = to_nodes("> one\n>\n> two");
        assert_eq!(
            nodes,
            vec![Node::element(
                Tag::Blockquote,
                vec![Node::text("one"), Node::empty(Tag::Br), Node::text("two")],
            )]
        );
    }

    #[test]
    fn loose_list_items_lose_paragraphs() {
        let nodes = to_nodes("1. alpha\n\n2. beta\n");
        assert!(nodes[0].is_tag(Tag::Ol));
        for li in nodes[0].children() {
            assert!(li.is_tag(Tag::Li));
            assert!(li.children().iter().all(|c| !c.is_tag(Tag::P)));
        }
        assert_eq!(nodes[0].children()[1].children(), &[Node::text("beta")]);
    }

    #[test]
    fn code_block_drops_language() {
        let nodes = to_nodes("```js\nlet a = 1;\n```");
        assert_eq!(nodes, vec![preformatted("let a = 1;\n".to_string())]);
    }

    #[test]
    fn thematic_break_is_hr() {
        let nodes = to_nodes("above\n\n---\n\nbelow");
        assert_eq!(nodes[1], Node::empty(Tag::Hr));
    }

    #[test]
    fn html_block_media_survives_at_top_level() {
        let nodes = to_nodes("<video src=\"https://x.test/v.mp4\"></video>\n");
        assert_eq!(nodes, vec![p(vec![Node::media(Tag::Video, "https://x.test/v.mp4")])]);
    }

    #[test]
    fn grouping_wraps_consecutive_inline_nodes() {
        let grouped = group_inline(vec![
            Node::text("a"),
            Node::empty(Tag::Br),
            Node::empty(Tag::Hr),
            Node::text("b"),
        ]);
        assert_eq!(
            grouped,
            vec![
                p(vec![Node::text("a"), Node::empty(Tag::Br)]),
                Node::empty(Tag::Hr),
                p(vec![Node::text("b")]),
            ]
        );
    }
}
