//! Centered overlays: yes/no confirmation, one-line text input, dismissable message.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::ui::theme::MUTED;
use crate::ui::util::centered;

fn frame(f: &mut ratatui::Frame<'_>, area: Rect, height: u16, title: &str, color: Color) -> Rect {
    let rect = centered(area, 60, height);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title.to_string());
    let inner = block.inner(rect);
    f.render_widget(block, rect);
    inner
}

pub fn draw_confirm(f: &mut ratatui::Frame<'_>, area: Rect, prompt: &str) {
    let inner = frame(f, area, 5, "Confirm", Color::Yellow);
    let lines = vec![
        Line::from(Span::styled(
            prompt.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "y / Enter: confirm    n / Esc: cancel",
            Style::default().fg(MUTED),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

pub fn draw_input(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    label: &str,
    text: &str,
    error: Option<&str>,
) {
    let inner = frame(f, area, 7, title, Color::Cyan);
    let mut lines = vec![
        Line::from(Span::styled(label.to_string(), Style::default().fg(MUTED))),
        Line::from(vec![
            Span::raw("> "),
            Span::raw(text.to_string()),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
        ]),
    ];
    if let Some(err) = error {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Enter: submit    Esc: cancel",
        Style::default().fg(MUTED),
    )));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

pub fn draw_message(f: &mut ratatui::Frame<'_>, area: Rect, text: &str) {
    let inner = frame(f, area, 6, "Error", Color::Red);
    let lines = vec![
        Line::from(text.to_string()),
        Line::from(Span::styled("press any key", Style::default().fg(MUTED))),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}
