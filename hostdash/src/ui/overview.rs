//! Overview tab: summary counters, agent list, latest metrics and recent alerts.

use chrono::Utc;
use hostdash_client::types::{Agent, AgentStats, Alert, MetricSample};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table},
};

use crate::ui::theme::{cursor_style, header_style, level_color, pct_color, MUTED};
use crate::ui::util::{ago, human, opt_pct, scroll_for, truncate_middle};

pub fn draw_stats(f: &mut ratatui::Frame<'_>, area: Rect, stats: &AgentStats, error: Option<&str>) {
    let kv = |k: &str, v: u64, color: Color| {
        vec![
            Span::styled(format!("{k}: "), Style::default().fg(MUTED)),
            Span::styled(
                v.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(kv("Agents", stats.total_agents, Color::White));
    spans.extend(kv("Active", stats.active_agents, Color::Green));
    spans.extend(kv("Pending registrations", stats.pending_registrations, Color::Yellow));
    spans.extend(kv("Logs (24h)", stats.recent_logs_count, Color::Cyan));
    spans.extend(kv("Alerts", stats.alerts_count, Color::LightRed));
    let mut lines = vec![Line::from(spans)];
    if let Some(err) = error {
        lines.push(Line::from(Span::styled(
            format!("{err} (press 'r' to retry)"),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Summary")),
        area,
    );
}

pub fn draw_agents(f: &mut ratatui::Frame<'_>, area: Rect, agents: &[Agent], cursor: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Agents ({})", agents.len()));
    if agents.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no data", Style::default().fg(MUTED))).block(block),
            area,
        );
        return;
    }
    let now = Utc::now();
    let viewport = area.height.saturating_sub(3) as usize;
    let first = scroll_for(cursor, viewport);
    let rows = agents
        .iter()
        .enumerate()
        .skip(first)
        .take(viewport)
        .map(|(i, a)| {
            let (state, color) = match (a.is_approved, a.is_active) {
                (false, _) => ("pending", Color::Yellow),
                (true, true) => ("active", Color::Green),
                (true, false) => ("inactive", MUTED),
            };
            let row = Row::new(vec![
                Cell::from(truncate_middle(&a.hostname, 24)),
                Cell::from(a.ip_address.clone().unwrap_or_else(|| "-".into())),
                Cell::from(state).style(Style::default().fg(color)),
                Cell::from(ago(a.last_seen, now)),
                Cell::from(a.log_count.to_string()),
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
            Constraint::Min(16),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(7),
        ],
    )
    .header(Row::new(vec!["Host", "IP", "State", "Seen", "Logs"]).style(header_style()))
    .block(block);
    f.render_widget(table, area);
}

fn gauge(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, value: Option<f64>) {
    let pct = value.unwrap_or(0.0).clamp(0.0, 100.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .gauge_style(Style::default().fg(pct_color(pct)))
        .ratio(pct / 100.0)
        .label(opt_pct(value));
    f.render_widget(g, area);
}

/// Latest CPU/memory/disk as gauges, CPU history as a sparkline.
pub fn draw_metrics(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    host: Option<&str>,
    samples: &[MetricSample],
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let latest = samples.iter().max_by_key(|s| s.timestamp);
    gauge(f, rows[0], "CPU", latest.and_then(|s| s.cpu_usage));
    gauge(f, rows[1], "Memory", latest.and_then(|s| s.memory_usage));
    gauge(f, rows[2], "Disk", latest.and_then(|s| s.disk_usage));

    let mut ordered: Vec<&MetricSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);
    let max_points = rows[3].width.saturating_sub(2) as usize;
    let start = ordered.len().saturating_sub(max_points);
    let data: Vec<u64> = ordered[start..]
        .iter()
        .map(|s| s.cpu_usage.unwrap_or(0.0).clamp(0.0, 100.0).round() as u64)
        .collect();
    let net = latest
        .map(|s| {
            format!(
                " | net ↑{} ↓{}",
                human(s.network_sent.unwrap_or(0)),
                human(s.network_received.unwrap_or(0))
            )
        })
        .unwrap_or_default();
    let title = format!(
        "CPU history: {} ({} samples){net}",
        host.unwrap_or("no agent selected"),
        samples.len()
    );
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .max(100)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(spark, rows[3]);
}

pub fn draw_recent_alerts(f: &mut ratatui::Frame<'_>, area: Rect, alerts: &[Alert]) {
    let now = Utc::now();
    let open: Vec<&Alert> = alerts.iter().filter(|a| !a.resolved).collect();
    let viewport = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = if open.is_empty() {
        vec![Line::from(Span::styled("no open alerts", Style::default().fg(MUTED)))]
    } else {
        open.iter()
            .take(viewport)
            .map(|a| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<8} ", a.level.as_str()),
                        Style::default().fg(level_color(a.level)),
                    ),
                    Span::raw(truncate_middle(&a.title, 40)),
                    Span::styled(
                        format!(
                            "  {} {}",
                            a.agent_hostname.as_deref().unwrap_or("-"),
                            ago(a.triggered_at, now)
                        ),
                        Style::default().fg(MUTED),
                    ),
                ])
            })
            .collect()
    };
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Open alerts ({})", open.len())),
        ),
        area,
    );
}
