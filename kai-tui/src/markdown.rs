//! Markdown to block tree.
//!
//! pulldown-cmark produces a flat, well-nested event stream; this module folds
//! it into [`Document`] so the renderer can work structurally. Raw HTML is kept
//! as text and never interpreted.
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, children: Vec<Inline> },
    Image { url: String, alt: String },
    Html(String),
    SoftBreak,
    HardBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// Ordered when `start` is set.
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    CodeBlock { lang: Option<String>, text: String },
    BlockQuote(Vec<Block>),
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Rule,
    Html(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Concatenated text of `inlines` with all formatting dropped.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain(inlines, &mut out);
    out
}

fn collect_plain(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(s) | Inline::Code(s) | Inline::Html(s) => out.push_str(s),
            Inline::Emphasis(c) | Inline::Strong(c) | Inline::Strikethrough(c) => {
                collect_plain(c, out)
            }
            Inline::Link { children, .. } => collect_plain(children, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
}

enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    Item(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Paragraph {
        inlines: Vec<Inline>,
        // tight list items carry text without a Paragraph tag
        implicit: bool,
    },
    Heading(u8, Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        url: String,
        children: Vec<Inline>,
    },
    Image {
        url: String,
        alt: String,
    },
    Code {
        lang: Option<String>,
        text: String,
    },
    HtmlBlock(String),
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Head(Vec<Vec<Inline>>),
    Row(Vec<Vec<Inline>>),
    Cell(Vec<Inline>),
    /// Tags with no dedicated treatment; their text flows into the parent.
    Other(Vec<Inline>),
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

/// Parse markdown with tables, strikethrough and task lists enabled.
pub fn parse(markdown: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder {
        stack: vec![Frame::Root(Vec::new())],
    };
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.finish()
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline(Inline::Code(code.into_string())),
            Event::InlineHtml(html) => self.inline(Inline::Html(html.into_string())),
            Event::Html(html) => self.html(&html),
            Event::SoftBreak => self.inline(Inline::SoftBreak),
            Event::HardBreak => self.inline(Inline::HardBreak),
            Event::Rule => self.block(Block::Rule),
            Event::TaskListMarker(done) => {
                self.inline(Inline::Text(if done { "[x] " } else { "[ ] " }.into()))
            }
            Event::FootnoteReference(name) => {
                self.inline(Inline::Text(format!("[^{}]", &*name)))
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph {
                inlines: Vec::new(),
                implicit: false,
            },
            Tag::Heading { level, .. } => Frame::Heading(heading_level(level), Vec::new()),
            Tag::BlockQuote(_) => Frame::Quote(Vec::new()),
            Tag::CodeBlock(kind) => Frame::Code {
                lang: match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        Some(lang.trim().to_string())
                    }
                    _ => None,
                },
                text: String::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item(Vec::new()),
            Tag::Table(_) => Frame::Table {
                head: Vec::new(),
                rows: Vec::new(),
            },
            Tag::TableHead => Frame::Head(Vec::new()),
            Tag::TableRow => Frame::Row(Vec::new()),
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Strikethrough => Frame::Strikethrough(Vec::new()),
            Tag::Link { dest_url, .. } => Frame::Link {
                url: dest_url.into_string(),
                children: Vec::new(),
            },
            Tag::Image { dest_url, .. } => Frame::Image {
                url: dest_url.into_string(),
                alt: String::new(),
            },
            _ => Frame::Other(Vec::new()),
        };

        if is_block_frame(&frame) {
            self.close_implicit();
        }
        self.stack.push(frame);
    }

    fn end(&mut self) {
        self.close_implicit();
        // the root frame is never closed by an event
        if self.stack.len() < 2 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Root(_) => {}
            Frame::Quote(blocks) => self.block(Block::BlockQuote(blocks)),
            Frame::Item(blocks) => {
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(blocks);
                }
            }
            Frame::List { start, items } => self.block(Block::List { start, items }),
            Frame::Paragraph { inlines, .. } => self.block(Block::Paragraph(inlines)),
            Frame::Heading(level, content) => self.block(Block::Heading { level, content }),
            Frame::Emphasis(c) => self.inline(Inline::Emphasis(c)),
            Frame::Strong(c) => self.inline(Inline::Strong(c)),
            Frame::Strikethrough(c) => self.inline(Inline::Strikethrough(c)),
            Frame::Link { url, children } => self.inline(Inline::Link { url, children }),
            Frame::Image { url, alt } => self.inline(Inline::Image { url, alt }),
            Frame::Code { lang, text } => self.block(Block::CodeBlock { lang, text }),
            Frame::HtmlBlock(html) => self.block(Block::Html(html)),
            Frame::Table { head, rows } => self.block(Block::Table { head, rows }),
            Frame::Head(cells) => {
                if let Some(Frame::Table { head, .. }) = self.stack.last_mut() {
                    *head = cells;
                }
            }
            Frame::Row(cells) => match self.stack.last_mut() {
                Some(Frame::Table { rows, .. }) => rows.push(cells),
                Some(Frame::Head(head)) => *head = cells,
                _ => {}
            },
            Frame::Cell(content) => {
                if let Some(Frame::Row(cells) | Frame::Head(cells)) = self.stack.last_mut() {
                    cells.push(content);
                }
            }
            Frame::Other(inlines) => {
                for inline in inlines {
                    self.inline(inline);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { text: buf, .. }) | Some(Frame::HtmlBlock(buf)) => buf.push_str(text),
            Some(Frame::Image { alt, .. }) => alt.push_str(text),
            _ => self.inline(Inline::Text(text.to_string())),
        }
    }

    fn html(&mut self, html: &str) {
        match self.stack.last_mut() {
            Some(Frame::HtmlBlock(buf)) => buf.push_str(html),
            _ => self.block(Block::Html(html.to_string())),
        }
    }

    fn inline(&mut self, inline: Inline) {
        if matches!(
            self.stack.last(),
            Some(Frame::Root(_) | Frame::Quote(_) | Frame::Item(_))
        ) {
            self.stack.push(Frame::Paragraph {
                inlines: Vec::new(),
                implicit: true,
            });
        }

        match self.stack.last_mut() {
            Some(
                Frame::Paragraph { inlines: v, .. }
                | Frame::Heading(_, v)
                | Frame::Emphasis(v)
                | Frame::Strong(v)
                | Frame::Strikethrough(v)
                | Frame::Link { children: v, .. }
                | Frame::Cell(v)
                | Frame::Other(v),
            ) => v.push(inline),
            Some(Frame::Image { alt, .. }) => alt.push_str(&plain_text(&[inline])),
            _ => {}
        }
    }

    fn block(&mut self, block: Block) {
        self.close_implicit();
        match self.stack.last_mut() {
            Some(Frame::Root(v) | Frame::Quote(v) | Frame::Item(v)) => v.push(block),
            _ => tracing::trace!(?block, "dropping block with no container"),
        }
    }

    fn close_implicit(&mut self) {
        if let Some(Frame::Paragraph { implicit: true, .. }) = self.stack.last() {
            if let Some(Frame::Paragraph { inlines, .. }) = self.stack.pop() {
                match self.stack.last_mut() {
                    Some(Frame::Root(v) | Frame::Quote(v) | Frame::Item(v)) => {
                        v.push(Block::Paragraph(inlines))
                    }
                    _ => {}
                }
            }
        }
    }

    fn finish(mut self) -> Document {
        self.close_implicit();
        while self.stack.len() > 1 {
            self.end();
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => Document { blocks },
            _ => Document::default(),
        }
    }
}

fn is_block_frame(frame: &Frame) -> bool {
    matches!(
        frame,
        Frame::Paragraph { .. }
            | Frame::Heading(..)
            | Frame::Quote(_)
            | Frame::Code { .. }
            | Frame::HtmlBlock(_)
            | Frame::List { .. }
            | Frame::Table { .. }
    )
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

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn title_then_body() {
        let doc = parse("# Title\n\nBody text");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading {
                    level: 1,
                    content: vec![text("Title")]
                },
                Block::Paragraph(vec![text("Body text")]),
            ]
        );
    }

    #[test]
    fn heading_levels_one_to_three() {
        let doc = parse("# a\n## b\n### c\n");
        let levels: Vec<u8> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, [1, 2, 3]);
    }

    #[test]
    fn tight_list_items_become_paragraphs() {
        let doc = parse("- one\n- two **bold**\n");
        let Block::List { start, items } = &doc.blocks[0] else {
            panic!("expected list, got {:?}", doc.blocks);
        };
        assert_eq!(*start, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], vec![Block::Paragraph(vec![text("one")])]);
        assert_eq!(
            items[1],
            vec![Block::Paragraph(vec![
                text("two "),
                Inline::Strong(vec![text("bold")])
            ])]
        );
    }

    #[test]
    fn ordered_list_keeps_start_and_nesting() {
        let doc = parse("3. first\n   - inner\n4. second\n");
        let Block::List { start, items } = &doc.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(*start, Some(3));
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0][1], Block::List { start: None, .. }));
    }

    #[test]
    fn fenced_code_keeps_language_and_text() {
        let doc = parse("```rust\nfn main() {}\n```\n");
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock {
                lang: Some("rust".into()),
                text: "fn main() {}\n".into()
            }]
        );
    }

    #[test]
    fn quotes_links_and_images() {
        let doc = parse("> see [docs](https://x.dev) and ![cat](c.png)\n");
        let Block::BlockQuote(inner) = &doc.blocks[0] else {
            panic!("expected quote");
        };
        let Block::Paragraph(inlines) = &inner[0] else {
            panic!("expected paragraph");
        };
        assert!(inlines.contains(&Inline::Link {
            url: "https://x.dev".into(),
            children: vec![text("docs")]
        }));
        assert!(inlines.contains(&Inline::Image {
            url: "c.png".into(),
            alt: "cat".into()
        }));
    }

    #[test]
    fn tables_split_head_and_rows() {
        let doc = parse("| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\n");
        let Block::Table { head, rows } = &doc.blocks[0] else {
            panic!("expected table, got {:?}", doc.blocks);
        };
        assert_eq!(head.len(), 2);
        assert_eq!(plain_text(&head[1]), "b");
        assert_eq!(rows.len(), 2);
        assert_eq!(plain_text(&rows[1][0]), "3");
    }

    #[test]
    fn raw_html_is_kept_as_text() {
        let doc = parse("<script>alert(1)</script>\n\nafter");
        assert!(matches!(&doc.blocks[0], Block::Html(h) if h.contains("<script>")));
        assert_eq!(doc.blocks[1], Block::Paragraph(vec![text("after")]));
    }

    #[test]
    fn empty_input_is_empty_document() {
        assert!(parse("").is_empty());
    }
}
