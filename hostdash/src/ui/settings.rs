//! Settings tab: alert thresholds and notification channels.

use hostdash_client::error::{ApiError, ApiResult};
use hostdash_client::types::{
    ChannelType, Comparison, NotificationChannel, ResourceType, Threshold,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::ui::form::{Field, Form};
use crate::ui::theme::{cursor_style, header_style, MUTED};
use crate::ui::util::{scroll_for, truncate_middle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsFocus {
    #[default]
    Thresholds,
    Channels,
}

impl SettingsFocus {
    pub fn toggle(self) -> Self {
        match self {
            SettingsFocus::Thresholds => SettingsFocus::Channels,
            SettingsFocus::Channels => SettingsFocus::Thresholds,
        }
    }
}

/// What a settings form will save once submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsDraft {
    Threshold { id: Option<i64> },
    /// `base` is the channel being edited; its config carries keys the form does not show.
    Channel { base: Option<NotificationChannel> },
}

const RESOURCE_TYPES: &[&str] = &["cpu", "memory", "disk", "network", "process"];
const COMPARISONS: &[&str] = &[">", "<", "="];
const CHANNEL_TYPES: &[&str] = &["email", "discord", "webhook"];
const YES_NO: &[&str] = &["yes", "no"];

fn yes_no(on: bool) -> &'static str {
    if on {
        "yes"
    } else {
        "no"
    }
}

fn parse_number<T: std::str::FromStr>(form: &Form, label: &str) -> ApiResult<T> {
    let raw = form.value(label);
    raw.parse()
        .map_err(|_| ApiError::validation(format!("{label} must be a number, got {raw:?}")))
}

fn optional(form: &Form, label: &str) -> Option<String> {
    let v = form.value(label);
    (!v.is_empty()).then(|| v.to_string())
}

pub fn threshold_form(existing: Option<&Threshold>) -> Form {
    let title = match existing {
        Some(t) => format!("Edit threshold: {}", t.name),
        None => "New threshold".to_string(),
    };
    let t = existing;
    Form::new(
        title,
        vec![
            Field::text("Name", t.map(|t| t.name.clone()).unwrap_or_default()),
            Field::choice(
                "Resource",
                RESOURCE_TYPES,
                t.map_or("cpu", |t| t.resource_type.as_str()),
            ),
            Field::text(
                "Value",
                t.map(|t| t.threshold_value.to_string()).unwrap_or_default(),
            ),
            Field::choice(
                "Comparison",
                COMPARISONS,
                t.map_or(">", |t| t.comparison.symbol()),
            ),
            Field::text(
                "Process name",
                t.and_then(|t| t.process_name.clone()).unwrap_or_default(),
            ),
            Field::text(
                "Duration (s)",
                t.map_or_else(|| "60".to_string(), |t| t.duration.to_string()),
            ),
            Field::choice("Active", YES_NO, yes_no(t.map_or(true, |t| t.is_active))),
        ],
    )
}

pub fn threshold_from_form(form: &Form, id: Option<i64>) -> ApiResult<Threshold> {
    let resource = form.value("Resource");
    let resource_type = ResourceType::ALL
        .into_iter()
        .find(|r| r.as_str() == resource)
        .ok_or_else(|| ApiError::validation(format!("Unknown resource type {resource:?}")))?;
    let symbol = form.value("Comparison");
    let comparison = Comparison::ALL
        .into_iter()
        .find(|c| c.symbol() == symbol)
        .ok_or_else(|| ApiError::validation(format!("Unknown comparison {symbol:?}")))?;
    let threshold = Threshold {
        id,
        name: form.value("Name").to_string(),
        resource_type,
        threshold_value: parse_number(form, "Value")?,
        comparison,
        process_name: optional(form, "Process name"),
        duration: parse_number(form, "Duration (s)")?,
        is_active: form.value("Active") == "yes",
    };
    threshold.validate()?;
    Ok(threshold)
}

pub fn channel_form(existing: Option<&NotificationChannel>) -> Form {
    let title = match existing {
        Some(c) => format!("Edit channel: {}", c.name),
        None => "New notification channel".to_string(),
    };
    let c = existing;
    let cfg = |get: fn(&NotificationChannel) -> Option<String>| c.and_then(get).unwrap_or_default();
    Form::new(
        title,
        vec![
            Field::text("Name", c.map(|c| c.name.clone()).unwrap_or_default()),
            Field::choice(
                "Type",
                CHANNEL_TYPES,
                c.map_or("email", |c| c.channel_type.as_str()),
            ),
            Field::text("SMTP server", cfg(|c| c.config.smtp_server.clone())),
            Field::text("Port", cfg(|c| c.config.port.map(|p| p.to_string()))),
            Field::text("Email", cfg(|c| c.config.email.clone())),
            Field::secret("Password"),
            Field::text("Webhook URL", cfg(|c| c.config.webhook_url.clone())),
            Field::choice("Active", YES_NO, yes_no(c.map_or(true, |c| c.is_active))),
        ],
    )
}

/// A blank password keeps the stored one.
pub fn channel_from_form(
    form: &Form,
    base: Option<&NotificationChannel>,
) -> ApiResult<NotificationChannel> {
    let kind = form.value("Type");
    let channel_type = ChannelType::ALL
        .into_iter()
        .find(|t| t.as_str() == kind)
        .ok_or_else(|| ApiError::validation(format!("Unknown channel type {kind:?}")))?;
    let mut config = base.map(|b| b.config.clone()).unwrap_or_default();
    config.smtp_server = optional(form, "SMTP server");
    config.port = match optional(form, "Port") {
        Some(_) => Some(parse_number(form, "Port")?),
        None => None,
    };
    config.email = optional(form, "Email");
    let password = form.raw("Password");
    if !password.is_empty() {
        config.password = Some(password.to_string());
    }
    config.webhook_url = optional(form, "Webhook URL");
    let channel = NotificationChannel {
        id: base.and_then(|b| b.id),
        name: form.value("Name").to_string(),
        channel_type,
        config,
        is_active: form.value("Active") == "yes",
    };
    channel.validate()?;
    Ok(channel)
}

fn active_cell(on: bool) -> Cell<'static> {
    if on {
        Cell::from("on").style(Style::default().fg(Color::Green))
    } else {
        Cell::from("off").style(Style::default().fg(MUTED))
    }
}

fn threshold_rule(t: &Threshold) -> String {
    let unit = match t.resource_type.as_str() {
        "cpu" | "memory" | "disk" => "%",
        _ => "",
    };
    let target = t
        .process_name
        .as_deref()
        .map(|p| format!("{p} "))
        .unwrap_or_default();
    format!(
        "{target}{} {} {}{unit} for {}s",
        t.resource_type.as_str(),
        t.comparison.symbol(),
        t.threshold_value,
        t.duration
    )
}

fn channel_target(c: &NotificationChannel) -> String {
    match c.channel_type {
        ChannelType::Email => format!(
            "{} via {}:{}",
            c.config.email.as_deref().unwrap_or("-"),
            c.config.smtp_server.as_deref().unwrap_or("-"),
            c.config.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
        ),
        ChannelType::Discord | ChannelType::Webhook => {
            truncate_middle(c.config.webhook_url.as_deref().unwrap_or("-"), 48)
        }
    }
}

pub fn draw_settings(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    thresholds: &[Threshold],
    channels: &[NotificationChannel],
    focus: SettingsFocus,
    cursor: usize,
) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let border = |on: bool| {
        if on {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let b = Block::default()
        .borders(Borders::ALL)
        .border_style(border(focus == SettingsFocus::Thresholds))
        .title(format!("Alert thresholds ({})", thresholds.len()));
    if thresholds.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no thresholds", Style::default().fg(MUTED))).block(b),
            parts[0],
        );
    } else {
        let cur = (focus == SettingsFocus::Thresholds).then_some(cursor);
        let viewport = parts[0].height.saturating_sub(3) as usize;
        let first = scroll_for(cur.unwrap_or(0), viewport);
        let rows = thresholds
            .iter()
            .enumerate()
            .skip(first)
            .take(viewport)
            .map(|(i, t)| {
                let row = Row::new(vec![
                    Cell::from(t.name.clone()),
                    Cell::from(threshold_rule(t)),
                    active_cell(t.is_active),
                ]);
                if cur == Some(i) {
                    row.style(cursor_style())
                } else {
                    row
                }
            });
        let table = Table::new(
            rows,
            [Constraint::Min(18), Constraint::Min(28), Constraint::Length(6)],
        )
        .header(Row::new(vec!["Name", "Rule", "Active"]).style(header_style()))
        .block(b);
        f.render_widget(table, parts[0]);
    }

    let b = Block::default()
        .borders(Borders::ALL)
        .border_style(border(focus == SettingsFocus::Channels))
        .title(format!("Notification channels ({})", channels.len()));
    if channels.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no channels", Style::default().fg(MUTED))).block(b),
            parts[1],
        );
    } else {
        let cur = (focus == SettingsFocus::Channels).then_some(cursor);
        let viewport = parts[1].height.saturating_sub(3) as usize;
        let first = scroll_for(cur.unwrap_or(0), viewport);
        let rows = channels
            .iter()
            .enumerate()
            .skip(first)
            .take(viewport)
            .map(|(i, c)| {
                let row = Row::new(vec![
                    Cell::from(c.name.clone()),
                    Cell::from(c.channel_type.as_str()),
                    Cell::from(channel_target(c)),
                    active_cell(c.is_active),
                ]);
                if cur == Some(i) {
                    row.style(cursor_style())
                } else {
                    row
                }
            });
        let table = Table::new(
            rows,
            [
                Constraint::Min(14),
                Constraint::Length(8),
                Constraint::Min(28),
                Constraint::Length(6),
            ],
        )
        .header(Row::new(vec!["Name", "Type", "Target", "Active"]).style(header_style()))
        .block(b);
        f.render_widget(table, parts[1]);
    }
}
