//! Block tree to styled, width-wrapped terminal lines.
//!
//! Every element kind gets one fixed treatment from [`crate::styles`]. Prose is
//! wrapped with textwrap's first-fit algorithm over styled fragments so a word
//! never loses its formatting when it moves to the next line; code blocks and
//! tables are laid out verbatim and hard-split or clipped instead.
use crate::markdown::{self, plain_text, Block, Document, Inline};
use crate::styles;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Parse and render in one step.
pub fn render_markdown(text: &str, width: u16) -> Vec<Line<'static>> {
    render(&markdown::parse(text), width)
}

pub fn render(doc: &Document, width: u16) -> Vec<Line<'static>> {
    let mut r = Renderer {
        width: usize::from(width).max(8),
        quote_depth: 0,
        lines: Vec::new(),
    };
    r.blocks(&doc.blocks, &mut Indent::default(), true);
    r.lines
}

/// Word-wrap a single run of plain text, one style throughout.
pub fn wrap_plain(text: &str, style: Style, width: u16) -> Vec<Line<'static>> {
    let avail = usize::from(width).max(1);
    let mut out = Vec::new();
    for raw in text.split('\n') {
        let segs = vec![Seg::new(raw, style)];
        let wrapped = wrap(&segs, avail);
        if wrapped.is_empty() {
            out.push(Line::default());
        }
        out.extend(wrapped.into_iter().map(to_line));
    }
    out
}

#[derive(Debug, Clone)]
struct Seg {
    text: String,
    style: Style,
}

impl Seg {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

fn segs_width(segs: &[Seg]) -> usize {
    segs.iter().map(|s| s.text.width()).sum()
}

fn to_line(segs: Vec<Seg>) -> Line<'static> {
    Line::from(
        segs.into_iter()
            .map(|s| Span::styled(s.text, s.style))
            .collect::<Vec<_>>(),
    )
}

/// Prefix for the next emitted line (`first`) and every line after it (`rest`).
#[derive(Debug, Clone, Default)]
struct Indent {
    first: Vec<Seg>,
    rest: Vec<Seg>,
}

impl Indent {
    fn nest(&self, first: Seg, rest: Seg) -> Self {
        let mut f = self.first.clone();
        f.push(first);
        let mut r = self.rest.clone();
        r.push(rest);
        Self { first: f, rest: r }
    }

    fn width(&self) -> usize {
        segs_width(&self.first).max(segs_width(&self.rest))
    }
}

struct Renderer {
    width: usize,
    quote_depth: usize,
    lines: Vec<Line<'static>>,
}

impl Renderer {
    fn avail(&self, indent: &Indent) -> usize {
        self.width.saturating_sub(indent.width()).max(1)
    }

    fn emit(&mut self, indent: &mut Indent, body: Vec<Seg>) {
        let mut segs = std::mem::replace(&mut indent.first, indent.rest.clone());
        segs.extend(body);
        self.lines.push(to_line(segs));
    }

    fn blocks(&mut self, blocks: &[Block], indent: &mut Indent, spaced: bool) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 && spaced {
                self.emit(indent, Vec::new());
            }
            self.block(block, indent);
        }
    }

    fn prose_style(&self) -> Style {
        if self.quote_depth > 0 {
            styles::quote()
        } else {
            styles::paragraph()
        }
    }

    fn prose(&mut self, inlines: &[Inline], base: Style, indent: &mut Indent) {
        let avail = self.avail(indent);
        for line in flatten(inlines, base) {
            for wrapped in wrap(&line, avail) {
                self.emit(indent, wrapped);
            }
        }
    }

    fn block(&mut self, block: &Block, indent: &mut Indent) {
        match block {
            Block::Heading { level, content } => {
                self.prose(content, styles::heading(*level), indent)
            }
            Block::Paragraph(content) => {
                let base = self.prose_style();
                self.prose(content, base, indent)
            }
            Block::List { start, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(s) => format!("{}. ", s + n as u64),
                        None => "• ".to_string(),
                    };
                    let pad = " ".repeat(marker.width());
                    let mut child =
                        indent.nest(Seg::new(marker, styles::bullet()), Seg::new(pad, Style::default()));
                    let before = self.lines.len();
                    self.blocks(item, &mut child, false);
                    if self.lines.len() > before {
                        indent.first = indent.rest.clone();
                    }
                }
            }
            Block::CodeBlock { lang, text } => self.code_block(lang.as_deref(), text, indent),
            Block::BlockQuote(inner) => {
                let bar = Seg::new("│ ", styles::quote_bar());
                let mut child = indent.nest(bar.clone(), bar);
                self.quote_depth += 1;
                let before = self.lines.len();
                self.blocks(inner, &mut child, true);
                self.quote_depth -= 1;
                if self.lines.len() > before {
                    indent.first = indent.rest.clone();
                }
            }
            Block::Table { head, rows } => self.table(head, rows, indent),
            Block::Rule => {
                let avail = self.avail(indent);
                self.emit(indent, vec![Seg::new("─".repeat(avail), styles::dim())]);
            }
            Block::Html(html) => {
                for line in html.trim_end_matches('\n').lines() {
                    self.emit(indent, vec![Seg::new(line, styles::dim())]);
                }
            }
        }
    }

    fn code_block(&mut self, lang: Option<&str>, text: &str, indent: &mut Indent) {
        let avail = self.avail(indent);
        if let Some(lang) = lang {
            self.emit(indent, vec![Seg::new(format!(" {lang} "), styles::dim())]);
        }
        for raw in text.trim_end_matches('\n').split('\n') {
            let expanded = raw.replace('\t', "    ");
            for chunk in hard_split(&expanded, avail) {
                let pad = avail.saturating_sub(chunk.width());
                self.emit(
                    indent,
                    vec![Seg::new(chunk + &" ".repeat(pad), styles::code_block())],
                );
            }
        }
    }

    fn table(&mut self, head: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>], indent: &mut Indent) {
        let head: Vec<String> = head.iter().map(|c| plain_text(c)).collect();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|c| plain_text(c)).collect())
            .collect();

        let columns = rows.iter().map(Vec::len).chain([head.len()]).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in rows.iter().chain(std::iter::once(&head)) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let sep = || Seg::new(" │ ", styles::table_border());
        let row_segs = |cells: &[String], style: Style| {
            let mut segs = Vec::new();
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    segs.push(sep());
                }
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(cell.width());
                segs.push(Seg::new(format!("{cell}{}", " ".repeat(pad)), style));
            }
            segs
        };

        if !head.is_empty() {
            self.emit(indent, row_segs(&head, styles::table_header()));
            let rule = widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("─┼─");
            self.emit(indent, vec![Seg::new(rule, styles::table_border())]);
        }
        let body = self.prose_style();
        for row in &rows {
            self.emit(indent, row_segs(row, body));
        }
    }
}

/// Inline tree to styled segments, one `Vec` per hard line.
fn flatten(inlines: &[Inline], base: Style) -> Vec<Vec<Seg>> {
    let mut lines = vec![Vec::new()];
    flatten_into(inlines, base, &mut lines);
    lines
}

fn flatten_into(inlines: &[Inline], base: Style, lines: &mut Vec<Vec<Seg>>) {
    for inline in inlines {
        match inline {
            Inline::Text(s) => push_seg(lines, Seg::new(s.as_str(), base)),
            Inline::Code(s) => push_seg(lines, Seg::new(s.as_str(), base.patch(styles::inline_code()))),
            Inline::Emphasis(c) => flatten_into(c, base.add_modifier(Modifier::ITALIC), lines),
            Inline::Strong(c) => flatten_into(c, base.add_modifier(Modifier::BOLD), lines),
            Inline::Strikethrough(c) => {
                flatten_into(c, base.add_modifier(Modifier::CROSSED_OUT), lines)
            }
            Inline::Link { url, children } => {
                flatten_into(children, base.patch(styles::link()), lines);
                if plain_text(children) != *url {
                    push_seg(lines, Seg::new(format!(" ({url})"), styles::dim()));
                }
            }
            Inline::Image { url, alt } => {
                let label = if alt.is_empty() {
                    format!("[image] ({url})")
                } else {
                    format!("[image: {alt}] ({url})")
                };
                push_seg(lines, Seg::new(label, styles::image()));
            }
            Inline::Html(s) => push_seg(lines, Seg::new(s.as_str(), styles::dim())),
            Inline::SoftBreak => push_seg(lines, Seg::new(" ", base)),
            Inline::HardBreak => lines.push(Vec::new()),
        }
    }
}

fn push_seg(lines: &mut Vec<Vec<Seg>>, seg: Seg) {
    if let Some(line) = lines.last_mut() {
        line.push(seg);
    }
}

/// A wrappable unit: non-blank text (possibly spanning styles) plus the
/// whitespace that follows it.
#[derive(Debug, Clone)]
struct Word {
    parts: Vec<Seg>,
    width: usize,
    ws: String,
    ws_style: Style,
}

impl Word {
    fn new() -> Self {
        Self {
            parts: Vec::new(),
            width: 0,
            ws: String::new(),
            ws_style: Style::default(),
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        match self.parts.last_mut() {
            Some(part) if part.style == style => part.text.push(ch),
            _ => self.parts.push(Seg::new(ch.to_string(), style)),
        }
        self.width += ch.width().unwrap_or(0);
    }
}

impl Fragment for Word {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn whitespace_width(&self) -> f64 {
        self.ws.width() as f64
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

fn split_words(segs: &[Seg]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut cur = Word::new();
    for seg in segs {
        for ch in seg.text.chars() {
            if ch.is_whitespace() {
                if cur.width > 0 {
                    if cur.ws.is_empty() {
                        cur.ws_style = seg.style;
                    }
                    cur.ws.push(' ');
                }
            } else {
                if !cur.ws.is_empty() {
                    words.push(std::mem::replace(&mut cur, Word::new()));
                }
                cur.push_char(ch, seg.style);
            }
        }
    }
    if cur.width > 0 {
        words.push(cur);
    }
    words
}

/// Break words wider than `avail` into pieces that fit.
fn split_long(word: Word, avail: usize) -> Vec<Word> {
    if word.width <= avail {
        return vec![word];
    }
    let mut out = Vec::new();
    let mut cur = Word::new();
    for part in &word.parts {
        for ch in part.text.chars() {
            let w = ch.width().unwrap_or(0);
            if cur.width + w > avail && cur.width > 0 {
                out.push(std::mem::replace(&mut cur, Word::new()));
            }
            cur.push_char(ch, part.style);
        }
    }
    cur.ws = word.ws;
    cur.ws_style = word.ws_style;
    out.push(cur);
    out
}

fn wrap(segs: &[Seg], avail: usize) -> Vec<Vec<Seg>> {
    let words: Vec<Word> = split_words(segs)
        .into_iter()
        .flat_map(|w| split_long(w, avail))
        .collect();
    if words.is_empty() {
        return Vec::new();
    }

    wrap_first_fit(&words, &[avail as f64])
        .into_iter()
        .map(|line| {
            let mut out = Vec::new();
            for (i, word) in line.iter().enumerate() {
                out.extend(word.parts.iter().cloned());
                if i + 1 < line.len() {
                    out.push(Seg::new(word.ws.as_str(), word.ws_style));
                }
            }
            out
        })
        .collect()
}

fn hard_split(text: &str, avail: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > avail && width > 0 {
            out.push(std::mem::take(&mut cur));
            width = 0;
        }
        cur.push(ch);
        width += w;
    }
    out.push(cur);
    out
}
