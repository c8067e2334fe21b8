//! Markdown lexing: folds the pulldown-cmark event stream into a token tree.

use once_cell::sync::Lazy;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Strong(Vec<Token>),
    Emphasis(Vec<Token>),
    Strikethrough(Vec<Token>),
    Code(String),
    Link {
        href: String,
        children: Vec<Token>,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    /// Hard break, or a newline inside a paragraph.
    LineBreak,
    Rule,
    Paragraph(Vec<Token>),
    Heading {
        level: u8,
        children: Vec<Token>,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    BlockQuote(Vec<Token>),
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
    Table(Table),
    Html(String),
    /// Constructs with no dedicated mapping (footnotes, definition lists...).
    Unknown(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// `Some(checked)` for task list items.
    pub task: Option<bool>,
    pub children: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

impl From<Alignment> for Align {
    fn from(a: Alignment) -> Self {
        match a {
            Alignment::None => Align::None,
            Alignment::Left => Align::Left,
            Alignment::Center => Align::Center,
            Alignment::Right => Align::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub align: Vec<Align>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineStyle {
    Bold,
    Italic,
}

enum Kind {
    Root,
    Paragraph,
    Heading(u8),
    BlockQuote,
    List { ordered: bool, items: Vec<ListItem> },
    Item { task: Option<bool> },
    CodeBlock(Option<String>),
    HtmlBlock,
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image { src: String, title: Option<String> },
    Table(Table),
    TableHead,
    TableRow,
    TableCell,
    /// `<b>`/`<i>`... opened by inline HTML, closed by its matching end tag.
    HtmlInline(InlineStyle, &'static str),
    Other,
}

struct Frame {
    kind: Kind,
    children: Vec<Token>,
}

impl Frame {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

static RE_STYLE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<(b|strong|i|em)(\s[^>]*)?>$").expect("style open regex"));
static RE_STYLE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^</(b|strong|i|em)\s*>$").expect("style close regex"));
static RE_BR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<br\s*/?>$").expect("br regex"));

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Lex `markdown` into block-level tokens.
pub fn lex(markdown: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        stack: vec![Frame::new(Kind::Root)],
    };
    for event in Parser::new_ext(markdown, parser_options()) {
        lexer.event(event);
    }
    lexer.finish()
}

struct Lexer {
    stack: Vec<Frame>,
}

impl Lexer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(_) => {
                self.close_dangling_styles();
                self.close();
            }
            Event::Text(t) => self.push(Token::Text(t.into_string())),
            Event::Code(c) => self.push(Token::Code(c.into_string())),
            Event::Html(h) => {
                if matches!(self.top_kind(), Kind::HtmlBlock) {
                    self.push(Token::Text(h.into_string()));
                } else {
                    self.push(Token::Html(h.into_string()));
                }
            }
            Event::InlineHtml(h) => self.inline_html(&h),
            Event::SoftBreak | Event::HardBreak => self.push(Token::LineBreak),
            Event::Rule => self.push(Token::Rule),
            Event::TaskListMarker(checked) => {
                if let Some(frame) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|f| matches!(f.kind, Kind::Item { .. }))
                {
                    frame.kind = Kind::Item {
                        task: Some(checked),
                    };
                }
            }
            Event::FootnoteReference(label) => {
                self.push(Token::Unknown(Some(format!("[^{label}]"))))
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => Kind::Paragraph,
            Tag::Heading { level, .. } => Kind::Heading(heading_level(level)),
            Tag::BlockQuote(_) => Kind::BlockQuote,
            Tag::CodeBlock(kind) => Kind::CodeBlock(match kind {
                CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.into_string()),
                _ => None,
            }),
            Tag::HtmlBlock => Kind::HtmlBlock,
            Tag::List(start) => Kind::List {
                ordered: start.is_some(),
                items: Vec::new(),
            },
            Tag::Item => Kind::Item { task: None },
            Tag::Emphasis => Kind::Emphasis,
            Tag::Strong => Kind::Strong,
            Tag::Strikethrough => Kind::Strikethrough,
            Tag::Link { dest_url, .. } => Kind::Link(dest_url.into_string()),
            Tag::Image {
                dest_url, title, ..
            } => Kind::Image {
                src: dest_url.into_string(),
                title: Some(title.into_string()).filter(|t| !t.is_empty()),
            },
            Tag::Table(align) => Kind::Table(Table {
                header: Vec::new(),
                align: align.into_iter().map(Align::from).collect(),
                rows: Vec::new(),
            }),
            Tag::TableHead => Kind::TableHead,
            Tag::TableRow => Kind::TableRow,
            Tag::TableCell => Kind::TableCell,
            _ => Kind::Other,
        };
        self.stack.push(Frame::new(kind));
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let children = frame.children;
        let token = match frame.kind {
            Kind::Root => return,
            Kind::Paragraph => Token::Paragraph(children),
            Kind::Heading(level) => Token::Heading { level, children },
            Kind::BlockQuote => Token::BlockQuote(children),
            Kind::CodeBlock(lang) => Token::CodeBlock {
                lang,
                text: plain_text(&children),
            },
            Kind::HtmlBlock => Token::Html(plain_text(&children)),
            Kind::List { ordered, items } => Token::List { ordered, items },
            Kind::Item { task } => {
                let item = ListItem { task, children };
                match self.stack.last_mut() {
                    Some(Frame {
                        kind: Kind::List { items, .. },
                        ..
                    }) => {
                        items.push(item);
                        return;
                    }
                    _ => Token::Paragraph(item.children),
                }
            }
            Kind::Emphasis | Kind::HtmlInline(InlineStyle::Italic, _) => Token::Emphasis(children),
            Kind::Strong | Kind::HtmlInline(InlineStyle::Bold, _) => Token::Strong(children),
            Kind::Strikethrough => Token::Strikethrough(children),
            Kind::Link(href) => Token::Link { href, children },
            Kind::Image { src, title } => Token::Image {
                src,
                alt: plain_text(&children),
                title,
            },
            Kind::Table(table) => Token::Table(table),
            Kind::TableCell => Token::Text(plain_text(&children).trim().to_string()),
            Kind::TableHead => {
                let cells = cell_texts(children);
                if let Some(Frame {
                    kind: Kind::Table(table),
                    ..
                }) = self.stack.last_mut()
                {
                    table.header = cells;
                }
                return;
            }
            Kind::TableRow => {
                let cells = cell_texts(children);
                if let Some(Frame {
                    kind: Kind::Table(table),
                    ..
                }) = self.stack.last_mut()
                {
                    table.rows.push(cells);
                }
                return;
            }
            Kind::Other => {
                let text = plain_text(&children);
                Token::Unknown(Some(text).filter(|t| !t.trim().is_empty()))
            }
        };
        // Cells are collected as raw text, never merged with a neighbour.
        if let Token::Text(_) = token {
            self.top().children.push(token);
        } else {
            self.push(token);
        }
    }

    fn inline_html(&mut self, html: &str) {
        let trimmed = html.trim();
        if let Some(caps) = RE_STYLE_OPEN.captures(trimmed) {
            let (style, name) = style_for(&caps[1]);
            self.stack.push(Frame::new(Kind::HtmlInline(style, name)));
            return;
        }
        if let Some(caps) = RE_STYLE_CLOSE.captures(trimmed) {
            let (_, name) = style_for(&caps[1]);
            if matches!(self.top_kind(), Kind::HtmlInline(_, open) if *open == name) {
                self.close();
            }
            // Unmatched closing tags carry no text.
            return;
        }
        if RE_BR.is_match(trimmed) {
            self.push(Token::LineBreak);
            return;
        }
        // Fragments that map to nothing must not split the surrounding text.
        if super::html::to_node(html).is_none() {
            return;
        }
        self.push(Token::Html(html.to_string()));
    }

    /// Folds `<b>`-style frames left open when their container ends.
    fn close_dangling_styles(&mut self) {
        while matches!(self.top_kind(), Kind::HtmlInline(..)) {
            self.close();
        }
    }

    fn finish(mut self) -> Vec<Token> {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().map(|f| f.children).unwrap_or_default()
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn top_kind(&self) -> &Kind {
        &self.stack[self.stack.len() - 1].kind
    }

    /// Pushes into the current frame, merging adjacent text fragments.
    fn push(&mut self, token: Token) {
        let children = &mut self.top().children;
        if let (Some(Token::Text(prev)), Token::Text(next)) = (children.last_mut(), &token) {
            prev.push_str(next);
            return;
        }
        children.push(token);
    }
}

fn style_for(name: &str) -> (InlineStyle, &'static str) {
    match name.to_ascii_lowercase().as_str() {
        "b" => (InlineStyle::Bold, "b"),
        "strong" => (InlineStyle::Bold, "strong"),
        "i" => (InlineStyle::Italic, "i"),
        _ => (InlineStyle::Italic, "em"),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn cell_texts(children: Vec<Token>) -> Vec<String> {
    children
        .into_iter()
        .map(|t| match t {
            Token::Text(s) => s,
            other => plain_text(std::slice::from_ref(&other)),
        })
        .collect()
}

/// Concatenated text content of a token list, markup dropped.
pub fn plain_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        push_plain(t, &mut out);
    }
    out
}

fn push_plain(token: &Token, out: &mut String) {
    match token {
        Token::Text(s) | Token::Code(s) | Token::Html(s) => out.push_str(s),
        Token::CodeBlock { text, .. } => out.push_str(text),
        Token::Strong(c)
        | Token::Emphasis(c)
        | Token::Strikethrough(c)
        | Token::Paragraph(c)
        | Token::BlockQuote(c)
        | Token::Link { children: c, .. }
        | Token::Heading { children: c, .. } => {
            for t in c {
                push_plain(t, out);
            }
        }
        Token::Image { alt, .. } => out.push_str(alt),
        Token::LineBreak => out.push(' '),
        Token::List { items, .. } => {
            for item in items {
                for t in &item.children {
                    push_plain(t, out);
                }
            }
        }
        Token::Unknown(Some(s)) => out.push_str(s),
        Token::Rule | Token::Table(_) | Token::Unknown(None) => {}
    }
}
