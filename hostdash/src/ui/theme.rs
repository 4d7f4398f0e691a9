//! Shared UI theme constants.

use hostdash_client::types::AlertLevel;
use ratatui::style::{Color, Modifier, Style};

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

pub const HEADER: Color = Color::Cyan;
pub const MUTED: Color = Color::DarkGray;

pub fn header_style() -> Style {
    Style::default().fg(HEADER).add_modifier(Modifier::BOLD)
}

pub fn cursor_style() -> Style {
    Style::default().bg(Color::Rgb(40, 44, 60)).add_modifier(Modifier::BOLD)
}

pub fn level_color(level: AlertLevel) -> Color {
    match level {
        AlertLevel::Critical => Color::Red,
        AlertLevel::High => Color::LightRed,
        AlertLevel::Medium => Color::Yellow,
        AlertLevel::Low => Color::Green,
        AlertLevel::Unknown => MUTED,
    }
}

/// Green/yellow/red by percentage, like the process table.
pub fn pct_color(v: f64) -> Color {
    match v {
        x if x < 60.0 => Color::Green,
        x if x < 85.0 => Color::Yellow,
        _ => Color::Red,
    }
}
