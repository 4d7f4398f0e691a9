//! Registrations tab: new requests, agents awaiting approval and approved agents.

use chrono::Utc;
use hostdash_client::workflow::ApprovalQueues;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::ui::theme::{cursor_style, header_style, MUTED};
use crate::ui::util::{ago, scroll_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueFocus {
    #[default]
    Requests,
    PendingAgents,
    ApprovedAgents,
}

impl QueueFocus {
    pub fn next(self) -> Self {
        match self {
            QueueFocus::Requests => QueueFocus::PendingAgents,
            QueueFocus::PendingAgents => QueueFocus::ApprovedAgents,
            QueueFocus::ApprovedAgents => QueueFocus::Requests,
        }
    }

    pub fn prev(self) -> Self {
        self.next().next()
    }

    pub fn len(self, q: &ApprovalQueues) -> usize {
        match self {
            QueueFocus::Requests => q.requests().len(),
            QueueFocus::PendingAgents => q.pending_agents().len(),
            QueueFocus::ApprovedAgents => q.approved_agents().len(),
        }
    }
}

fn block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn empty(f: &mut ratatui::Frame<'_>, area: Rect, b: Block<'static>, text: &str) {
    f.render_widget(
        Paragraph::new(Span::styled(text.to_string(), Style::default().fg(MUTED))).block(b),
        area,
    );
}

pub fn draw_registrations(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    queues: &ApprovalQueues,
    focus: QueueFocus,
    cursor: usize,
) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);
    let now = Utc::now();
    let cursor_for = |q: QueueFocus| (focus == q).then_some(cursor);

    // New registration requests
    let b = block(
        format!("Registration requests ({})", queues.requests().len()),
        focus == QueueFocus::Requests,
    );
    if queues.requests().is_empty() {
        empty(f, parts[0], b, "no pending requests");
    } else {
        let cur = cursor_for(QueueFocus::Requests);
        let viewport = parts[0].height.saturating_sub(3) as usize;
        let first = scroll_for(cur.unwrap_or(0), viewport);
        let rows = queues
            .requests()
            .iter()
            .enumerate()
            .skip(first)
            .take(viewport)
            .map(|(i, r)| {
                let row = Row::new(vec![
                    Cell::from(format!("#{}", r.id)),
                    Cell::from(r.hostname.clone()),
                    Cell::from(r.username.clone()),
                    Cell::from(r.ip_address.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(ago(r.requested_at, now)),
                ]);
                if cur == Some(i) {
                    row.style(cursor_style())
                } else {
                    row
                }
            });
        let t = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(16),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Length(10),
            ],
        )
        .header(Row::new(vec!["Id", "Host", "User", "IP", "Requested"]).style(header_style()))
        .block(b);
        f.render_widget(t, parts[0]);
    }

    for (idx, (q, agents, title, none)) in [
        (
            QueueFocus::PendingAgents,
            queues.pending_agents(),
            "Agents awaiting approval",
            "no agents awaiting approval",
        ),
        (
            QueueFocus::ApprovedAgents,
            queues.approved_agents(),
            "Approved agents",
            "no approved agents",
        ),
    ]
    .into_iter()
    .enumerate()
    {
        let area = parts[idx + 1];
        let b = block(format!("{title} ({})", agents.len()), focus == q);
        if agents.is_empty() {
            empty(f, area, b, none);
            continue;
        }
        let cur = cursor_for(q);
        let viewport = area.height.saturating_sub(3) as usize;
        let first = scroll_for(cur.unwrap_or(0), viewport);
        let rows = agents
            .iter()
            .enumerate()
            .skip(first)
            .take(viewport)
            .map(|(i, a)| {
                let row = Row::new(vec![
                    Cell::from(format!("#{}", a.id)),
                    Cell::from(a.hostname.clone()),
                    Cell::from(a.ip_address.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(if a.is_active { "active" } else { "inactive" }),
                    Cell::from(ago(a.last_seen, now)),
                ]);
                if cur == Some(i) {
                    row.style(cursor_style())
                } else {
                    row
                }
            });
        let t = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(16),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(10),
            ],
        )
        .header(Row::new(vec!["Id", "Host", "IP", "State", "Seen"]).style(header_style()))
        .block(b);
        f.render_widget(t, area);
    }
}
