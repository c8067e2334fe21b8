//! Rich-document nodes in the Telegra.ph `Node` format.
//!
//! A node is either a plain string or an element with a tag, optional
//! `href`/`src` attributes and children. The tag set is closed, so a tree
//! built from these types can only ever contain tags the publisher accepts.

use serde::{Deserialize, Serialize};

/// Tags accepted by the Telegra.ph API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    A,
    Aside,
    B,
    Blockquote,
    Br,
    Code,
    Em,
    Figcaption,
    Figure,
    H3,
    H4,
    Hr,
    I,
    Iframe,
    Img,
    Li,
    Ol,
    P,
    Pre,
    S,
    Strong,
    U,
    Ul,
    Video,
}

impl Tag {
    /// Tags that may stand on their own at the top level of a page.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Tag::P
                | Tag::H3
                | Tag::H4
                | Tag::Blockquote
                | Tag::Aside
                | Tag::Figure
                | Tag::Ul
                | Tag::Ol
                | Tag::Hr
                | Tag::Pre
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::A => "a",
            Tag::Aside => "aside",
            Tag::B => "b",
            Tag::Blockquote => "blockquote",
            Tag::Br => "br",
            Tag::Code => "code",
            Tag::Em => "em",
            Tag::Figcaption => "figcaption",
            Tag::Figure => "figure",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::Hr => "hr",
            Tag::I => "i",
            Tag::Iframe => "iframe",
            Tag::Img => "img",
            Tag::Li => "li",
            Tag::Ol => "ol",
            Tag::P => "p",
            Tag::Pre => "pre",
            Tag::S => "s",
            Tag::Strong => "strong",
            Tag::U => "u",
            Tag::Ul => "ul",
            Tag::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn element(tag: Tag, children: Vec<Node>) -> Self {
        Node::Element(Element {
            tag,
            attrs: None,
            children,
        })
    }

    /// Childless element such as `br` or `hr`.
    pub fn empty(tag: Tag) -> Self {
        Self::element(tag, Vec::new())
    }

    pub fn link(href: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(Element {
            tag: Tag::A,
            attrs: Some(Attrs {
                href: Some(href.into()),
                src: None,
            }),
            children,
        })
    }

    /// `img`, `video` or `iframe` pointing at `src`.
    pub fn media(tag: Tag, src: impl Into<String>) -> Self {
        Node::Element(Element {
            tag,
            attrs: Some(Attrs {
                href: None,
                src: Some(src.into()),
            }),
            children: Vec::new(),
        })
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            Node::Text(_) => None,
            Node::Element(el) => Some(el.tag),
        }
    }

    pub fn is_tag(&self, tag: Tag) -> bool {
        self.tag() == Some(tag)
    }

    pub fn is_block(&self) -> bool {
        self.tag().is_some_and(Tag::is_block)
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Text(_) => &[],
            Node::Element(el) => &el.children,
        }
    }

    /// Consumes the node and returns its children (empty for text).
    pub fn into_children(self) -> Vec<Node> {
        match self {
            Node::Text(_) => Vec::new(),
            Node::Element(el) => el.children,
        }
    }

    pub fn attr_src(&self) -> Option<&str> {
        match self {
            Node::Element(Element {
                attrs: Some(a), ..
            }) => a.src.as_deref(),
            _ => None,
        }
    }
}

/// Renders a node tree as plain text: blocks separated by blank lines,
/// `br` as newline, list items prefixed with `- `.
pub fn render_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out.trim().to_string()
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(s) => out.push_str(s),
        Node::Element(el) => match el.tag {
            Tag::Br => out.push('\n'),
            Tag::Hr => out.push_str("\n---\n\n"),
            Tag::Img | Tag::Video | Tag::Iframe => {
                if let Some(src) = node.attr_src() {
                    out.push_str(src);
                }
            }
            Tag::Li => {
                out.push_str("- ");
                for c in &el.children {
                    write_node(c, out);
                }
                out.push('\n');
            }
            Tag::Ul | Tag::Ol => {
                for c in &el.children {
                    write_node(c, out);
                }
                out.push('\n');
            }
            Tag::Figcaption => {
                out.push('\n');
                for c in &el.children {
                    write_node(c, out);
                }
            }
            tag => {
                for c in &el.children {
                    write_node(c, out);
                }
                if tag.is_block() {
                    out.push_str("\n\n");
                }
            }
        },
    }
}
