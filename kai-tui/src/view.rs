use crate::markdown::Document;
use crate::render;
use crate::state::{Notice, NoticeKind};
use crate::styles;
use anyhow::Result;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

pub const TAGLINE: &str =
    "Kai is an AI assistant that can help you with alot random questions bugging you.";

/// Borrowed view of the UI state for one frame.
pub struct ViewSnap<'a> {
    pub input: &'a str,
    pub input_cursor: usize,
    /// Prompt echoed above the response.
    pub prompt: Option<&'a str>,
    pub doc: &'a Document,
    pub scroll: usize,
    pub loading: bool,
    pub spinner: &'static str,
    pub copied: bool,
    pub notice: Option<&'a Notice>,
}

/// Draw one frame. Returns the largest useful scroll offset for the response
/// panel at the current terminal size.
pub fn draw<B: Backend>(term: &mut Terminal<B>, snap: &ViewSnap<'_>) -> Result<usize> {
    let mut max_scroll = 0;
    term.draw(|frame| max_scroll = draw_frame(frame, snap))?;
    Ok(max_scroll)
}

fn draw_frame(frame: &mut Frame<'_>, snap: &ViewSnap<'_>) -> usize {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    // Header
    let header = Paragraph::new(vec![
        Line::from(Span::styled(" Kai ", styles::title())),
        Line::from(Span::styled(format!(" {TAGLINE}"), styles::dim())),
    ]);
    frame.render_widget(header, layout[0]);

    // Response
    let max_scroll = draw_response(frame, layout[1], snap);

    // Input box
    let input_box = Paragraph::new(snap.input)
        .block(Block::default().borders(Borders::ALL).title(" Prompt "));
    frame.render_widget(Clear, layout[2]);
    frame.render_widget(input_box, layout[2]);

    let caret_x = layout[2].x + 1 + visual_caret_col(snap.input, snap.input_cursor);
    let caret_y = layout[2].y + 1;
    frame.set_cursor_position(Position {
        x: caret_x.min(layout[2].right().saturating_sub(2)),
        y: caret_y,
    });

    frame.render_widget(Paragraph::new(status_line(snap)), layout[3]);

    max_scroll
}

fn draw_response(frame: &mut Frame<'_>, area: Rect, snap: &ViewSnap<'_>) -> usize {
    let visible_h = usize::from(area.height.saturating_sub(2));
    let width = area.width.saturating_sub(2);
    let lines = response_lines(snap, width);
    let max_scroll = lines.len().saturating_sub(visible_h);
    let scroll = snap.scroll.min(max_scroll);

    let mut title = vec![Span::raw(" Response ")];
    if max_scroll > 0 {
        title.push(Span::styled(
            format!("{}/{} ", scroll + 1, max_scroll + 1),
            styles::dim(),
        ));
    }

    let body = Paragraph::new(lines)
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
        .block(Block::default().borders(Borders::ALL).title(Line::from(title)));
    frame.render_widget(body, area);
    max_scroll
}

/// Content of the response panel wrapped to `width`.
pub fn response_lines(snap: &ViewSnap<'_>, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(prompt) = snap.prompt {
        let mut echo = render::wrap_plain(prompt, styles::user_text(), width.saturating_sub(2));
        for (i, line) in echo.iter_mut().enumerate() {
            let lead = if i == 0 { "› " } else { "  " };
            line.spans.insert(0, Span::styled(lead, styles::user_header()));
        }
        lines.extend(echo);
        lines.push(Line::default());
    }

    if snap.doc.is_empty() {
        if snap.prompt.is_none() && !snap.loading {
            lines.push(Line::from(Span::styled(
                "Ask anything. Enter sends, /help lists commands.",
                styles::dim(),
            )));
        }
    } else {
        lines.extend(render::render(snap.doc, width));
    }
    lines
}

fn status_line(snap: &ViewSnap<'_>) -> Line<'static> {
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(snap.spinner, styles::busy()),
        Span::raw(" "),
        if snap.loading {
            Span::styled("Generating…", styles::busy())
        } else {
            Span::styled("Ready", styles::ready())
        },
    ];
    if snap.copied {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(" Copied! ", styles::copied()));
    }
    if let Some(notice) = snap.notice {
        let style = match notice.kind {
            NoticeKind::Info => styles::dim(),
            NoticeKind::Error => styles::error(),
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.text.clone(), style));
    }
    spans.push(Span::styled("  Ctrl+Y copy · PgUp/PgDn scroll · Ctrl+Q quit", styles::dim()));
    Line::from(spans)
}

fn visual_caret_col(input: &str, cursor: usize) -> u16 {
    u16::try_from(input[..cursor].width()).unwrap_or(u16::MAX)
}
