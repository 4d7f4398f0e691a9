//! Alerts tab: paginated table with selection marks, a detail pane for the
//! cursor row and a page-number bar.

use chrono::Utc;
use hostdash_client::listing::{AlertListState, PageItem};
use hostdash_client::types::{Alert, AlertFilters};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use crate::ui::theme::{cursor_style, header_style, level_color, MUTED};
use crate::ui::util::{ago, scroll_for, truncate_middle};

const DETAIL_HEIGHT: u16 = 8;

/// `agent_label` names the filtered agent; the raw id is shown without it.
pub fn filter_summary(f: &AlertFilters, agent_label: Option<&str>) -> String {
    let mut parts = Vec::new();
    parts.push(match f.resolved {
        None => "all".to_string(),
        Some(false) => "open".to_string(),
        Some(true) => "resolved".to_string(),
    });
    if let Some(level) = f.level {
        parts.push(level.as_str().to_string());
    }
    if let Some(kind) = f.alert_type {
        parts.push(kind.as_str().to_string());
    }
    if let Some(agent) = f.agent.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("host={}", agent_label.unwrap_or(agent)));
    }
    parts.join(", ")
}

/// Title, description, notes and metadata of one alert.
pub fn detail_lines(a: &Alert) -> Vec<Line<'static>> {
    let label = |s: &str| Span::styled(format!("{s:<12}"), Style::default().fg(MUTED));
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("#{} ", a.id),
            Style::default().fg(level_color(a.level)).add_modifier(Modifier::BOLD),
        ),
        Span::styled(a.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ])];
    if !a.description.is_empty() {
        lines.push(Line::from(vec![label("Description"), Span::raw(a.description.clone())]));
    }
    for (i, note) in a.notes.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let head = if i == 0 { label("Notes") } else { label("") };
        lines.push(Line::from(vec![head, Span::raw(note.to_string())]));
    }
    let mut keys: Vec<&String> = a.metadata.keys().collect();
    keys.sort();
    for key in keys {
        let value = a.metadata_str(key).unwrap_or_default();
        lines.push(Line::from(vec![
            label(key.as_str()),
            Span::raw(truncate_middle(&value, 60)),
        ]));
    }
    lines
}

pub fn draw_alerts(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AlertListState,
    cursor: usize,
    agent_label: Option<&str>,
) {
    let rows_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(DETAIL_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    let view = state.view();
    let sort = state.sort();
    let title = format!(
        "Alerts [{}] sorted by {} {} | {} selected",
        filter_summary(state.filters(), agent_label),
        sort.key.label(),
        if sort.descending { "↓" } else { "↑" },
        state.selected().len(),
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if view.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no alerts", Style::default().fg(MUTED))).block(block),
            rows_area[0],
        );
    } else {
        let now = Utc::now();
        let viewport = rows_area[0].height.saturating_sub(3) as usize;
        let first = scroll_for(cursor, viewport);
        let rows = view
            .iter()
            .enumerate()
            .skip(first)
            .take(viewport)
            .map(|(i, a)| {
                let mark = if state.is_selected(a.id) { "[x]" } else { "[ ]" };
                let (status, status_fg) = if a.resolved {
                    ("resolved", Color::Green)
                } else {
                    ("open", Color::Yellow)
                };
                let note = if a.notes.is_empty() { "" } else { " ✎" };
                let row = Row::new(vec![
                    Cell::from(mark),
                    Cell::from(a.level.as_str()).style(
                        Style::default()
                            .fg(level_color(a.level))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Cell::from(a.alert_type.as_str()),
                    Cell::from(format!("{}{note}", truncate_middle(&a.title, 48))),
                    Cell::from(a.agent_hostname.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(ago(a.triggered_at, now)),
                    Cell::from(status).style(Style::default().fg(status_fg)),
                ]);
                if i == cursor {
                    row.style(cursor_style())
                } else {
                    row
                }
            });
        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(8),
                Constraint::Length(14),
                Constraint::Min(20),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(8),
            ],
        )
        .header(
            Row::new(vec!["", "Level", "Type", "Title", "Host", "Triggered", "Status"])
                .style(header_style()),
        )
        .block(block);
        f.render_widget(table, rows_area[0]);
    }

    let detail = Block::default().borders(Borders::ALL).title("Details");
    let body = match view.get(cursor) {
        Some(a) => Paragraph::new(detail_lines(a)).wrap(Wrap { trim: false }),
        None => Paragraph::new(Span::styled("no alert selected", Style::default().fg(MUTED))),
    };
    f.render_widget(body.block(detail), rows_area[1]);

    f.render_widget(Paragraph::new(page_bar(state)), rows_area[2]);
}

fn page_bar(state: &AlertListState) -> Line<'static> {
    let p = state.pagination();
    let mut spans = vec![Span::styled("« ", Style::default().fg(MUTED))];
    for item in state.page_controls() {
        match item {
            PageItem::Page(n) if n == state.page() => spans.push(Span::styled(
                format!("[{n}] "),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            PageItem::Page(n) => spans.push(Span::raw(format!("{n} "))),
            PageItem::Ellipsis => spans.push(Span::styled("… ", Style::default().fg(MUTED))),
        }
    }
    spans.push(Span::styled("»", Style::default().fg(MUTED)));
    spans.push(Span::styled(
        format!(
            "   page {}/{} | {} alerts",
            state.page(),
            p.total_pages.max(1),
            p.total
        ),
        Style::default().fg(MUTED),
    ));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostdash_client::types::AlertType;
    use serde_json::json;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn summary_names_the_filtered_host() {
        let f = AlertFilters {
            resolved: Some(false),
            agent: Some("7".into()),
            alert_type: Some(AlertType::Security),
            ..Default::default()
        };
        assert_eq!(filter_summary(&f, Some("web-1")), "open, security, host=web-1");
        assert_eq!(filter_summary(&f, None), "open, security, host=7");
        assert_eq!(filter_summary(&AlertFilters::default(), None), "all");
    }

    #[test]
    fn details_show_description_notes_and_sorted_metadata() {
        let a: Alert = serde_json::from_value(json!({
            "id": 3,
            "title": "CPU high",
            "description": "cpu above 90% for 5m",
            "level": "high",
            "alert_type": "resource",
            "resolved": false,
            "notes": "checked\nrestarted worker",
            "metadata": {"value": 93.5, "host": "web-1"}
        }))
        .unwrap();
        let lines: Vec<String> = detail_lines(&a).iter().map(text).collect();
        assert_eq!(lines[0], "#3 CPU high");
        assert!(lines[1].starts_with("Description") && lines[1].ends_with("cpu above 90% for 5m"));
        assert!(lines[2].starts_with("Notes") && lines[2].ends_with("checked"));
        assert!(lines[3].ends_with("restarted worker"));
        assert!(lines[4].starts_with("host") && lines[4].ends_with("web-1"));
        assert!(lines[5].starts_with("value") && lines[5].ends_with("93.5"));
        assert_eq!(lines.len(), 6);
    }
}
