//! Title line with backend and snapshot summary, plus the tab bar.

use chrono::Utc;
use hostdash_client::Snapshot;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};

use crate::ui::theme::MUTED;
use crate::ui::util::ago;

pub const TAB_TITLES: [&str; 4] = ["1 Overview", "2 Alerts", "3 Registrations", "4 Settings"];

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, api: &str, snap: Option<&Snapshot>) {
    let title = match snap {
        Some(s) if !s.is_loading() => format!(
            "hostdash — {api} | agents: {}/{} active | open alerts: {} | updated {}  (press 'q' to quit)",
            s.stats.active_agents,
            s.stats.total_agents,
            s.alerts.iter().filter(|a| !a.resolved).count(),
            ago(s.updated_at, Utc::now()),
        ),
        Some(_) => format!("hostdash — {api} | loading...  (press 'q' to quit)"),
        None => format!("hostdash — {api} | signed out  (press 'q' to quit)"),
    };
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}

pub fn draw_tabs(f: &mut ratatui::Frame<'_>, area: Rect, selected: usize) {
    let tabs = Tabs::new(TAB_TITLES.to_vec())
        .select(selected)
        .style(Style::default().fg(MUTED))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, area);
}

/// One-line footer: status text on the left, key hints on the right.
pub fn draw_footer(f: &mut ratatui::Frame<'_>, area: Rect, status: Option<&str>, hints: &str) {
    let mut spans = Vec::new();
    if let Some(s) = status {
        spans.push(Span::styled(s.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(hints.to_string(), Style::default().fg(MUTED)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
