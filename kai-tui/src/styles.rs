use ratatui::style::{Color, Modifier, Style};

pub fn title() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn user_header() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn user_text() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn error() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

pub fn busy() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn ready() -> Style {
    Style::default().fg(Color::Green)
}

pub fn copied() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::LightGreen)
        .add_modifier(Modifier::BOLD)
}

// markdown

pub fn heading(level: u8) -> Style {
    match level {
        1 => Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        2 => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        _ => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
    }
}

pub fn paragraph() -> Style {
    Style::default().fg(Color::White)
}

pub fn bullet() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn inline_code() -> Style {
    Style::default().fg(Color::LightYellow).bg(Color::Rgb(40, 40, 40))
}

pub fn code_block() -> Style {
    Style::default().fg(Color::Gray).bg(Color::Rgb(30, 30, 30))
}

pub fn quote() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC)
}

pub fn quote_bar() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn link() -> Style {
    Style::default()
        .fg(Color::LightBlue)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn image() -> Style {
    Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::ITALIC)
}

pub fn table_header() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn table_border() -> Style {
    Style::default().fg(Color::DarkGray)
}
