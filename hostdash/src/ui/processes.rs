//! Process table for the selected agent: per-cell coloring, sorting, root marker and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use hostdash_client::types::{ProcessEntry, ProcessSnapshot};
use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ui::theme::{header_style, SB_ARROW, SB_THUMB, SB_TRACK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcSortBy {
    #[default]
    CpuDesc,
    MemDesc,
}

impl ProcSortBy {
    pub fn toggle(self) -> Self {
        match self {
            ProcSortBy::CpuDesc => ProcSortBy::MemDesc,
            ProcSortBy::MemDesc => ProcSortBy::CpuDesc,
        }
    }
}

const COLS: [Constraint; 5] = [
    Constraint::Length(8),      // PID
    Constraint::Percentage(40), // Name
    Constraint::Length(10),     // User
    Constraint::Length(8),      // CPU %
    Constraint::Length(8),      // Mem %
];

/// Top-CPU and top-memory lists merged by pid, then sorted.
pub fn merged_rows(snap: &ProcessSnapshot, sort_by: ProcSortBy) -> Vec<ProcessEntry> {
    let mut by_pid: BTreeMap<i64, ProcessEntry> = BTreeMap::new();
    for p in snap
        .top_cpu_processes
        .iter()
        .chain(snap.top_memory_processes.iter())
    {
        by_pid.entry(p.pid).or_insert_with(|| p.clone());
    }
    let mut rows: Vec<ProcessEntry> = by_pid.into_values().collect();
    match sort_by {
        ProcSortBy::CpuDesc => rows.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(Ordering::Equal)
        }),
        ProcSortBy::MemDesc => rows.sort_by(|a, b| {
            b.memory_percent
                .partial_cmp(&a.memory_percent)
                .unwrap_or(Ordering::Equal)
        }),
    }
    rows
}

pub fn draw_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    snap: Option<&ProcessSnapshot>,
    scroll_offset: usize,
    sort_by: ProcSortBy,
) {
    let Some(ps) = snap else {
        f.render_widget(Block::default().borders(Borders::ALL).title("Processes"), area);
        return;
    };
    let load = match ps.load_average.as_slice() {
        [a, b, c, ..] => format!(" | load {a:.2} {b:.2} {c:.2}"),
        _ => String::new(),
    };
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Processes on {} ({} total, {} root){load}",
        ps.hostname, ps.total_processes, ps.root_processes
    ));
    f.render_widget(block, area);

    // Inner area and content area (reserve 2 columns for scrollbar)
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 1 || inner.width < 3 {
        return;
    }
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let rows = merged_rows(ps, sort_by);
    let total_rows = rows.len();
    let viewport_rows = content.height.saturating_sub(1) as usize;
    let max_off = total_rows.saturating_sub(viewport_rows);
    let offset = scroll_offset.min(max_off);

    let peak_cpu = rows.iter().map(|p| p.cpu_percent).fold(0.0_f64, f64::max);

    let body = rows.iter().skip(offset).take(viewport_rows).map(|p| {
        let cpu_fg = match p.cpu_percent {
            x if x < 25.0 => Color::Green,
            x if x < 60.0 => Color::Yellow,
            _ => Color::Red,
        };
        let mem_fg = match p.memory_percent {
            x if x < 5.0 => Color::Blue,
            x if x < 20.0 => Color::Magenta,
            _ => Color::Red,
        };
        let emphasis = if peak_cpu > 0.0 && (p.cpu_percent - peak_cpu).abs() < f64::EPSILON {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let user_style = if p.is_root {
            Style::default().fg(Color::LightRed)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(p.name.clone()),
            Cell::from(p.user.clone()).style(user_style),
            Cell::from(format!("{:>5.1}", p.cpu_percent.clamp(0.0, 100.0)))
                .style(Style::default().fg(cpu_fg)),
            Cell::from(format!("{:.2}%", p.memory_percent)).style(Style::default().fg(mem_fg)),
        ])
        .style(emphasis)
    });

    let cpu_hdr = match sort_by {
        ProcSortBy::CpuDesc => "CPU % •",
        _ => "CPU %",
    };
    let mem_hdr = match sort_by {
        ProcSortBy::MemDesc => "Mem % •",
        _ => "Mem %",
    };
    let header = Row::new(vec!["PID", "Name", "User", cpu_hdr, mem_hdr]).style(header_style());

    let table = Table::new(body, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    draw_scrollbar(f, scroll_area, total_rows, viewport_rows, offset);
}

/// Arrow/track/thumb scrollbar in a one-column area.
pub fn draw_scrollbar(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    total_rows: usize,
    viewport_rows: usize,
    offset: usize,
) {
    if area.height < 3 {
        return;
    }
    let track = (area.height - 2) as usize;
    let total = total_rows.max(1);
    let view = viewport_rows.clamp(1, total);
    let max_off = total.saturating_sub(view);

    let thumb_len = (track * view).div_ceil(total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset.min(max_off) + max_off / 2) / max_off
    };

    let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), area);
}

/// Keyboard scrolling (PageUp/PageDown/Home/End, j/k by one row).
pub fn processes_handle_key(scroll_offset: &mut usize, key: KeyEvent, page_size: usize) {
    match key.code {
        KeyCode::Char('j') => *scroll_offset = scroll_offset.saturating_add(1),
        KeyCode::Char('k') => *scroll_offset = scroll_offset.saturating_sub(1),
        KeyCode::PageDown => *scroll_offset = scroll_offset.saturating_add(page_size.max(1)),
        KeyCode::PageUp => *scroll_offset = scroll_offset.saturating_sub(page_size.max(1)),
        KeyCode::Home => *scroll_offset = 0,
        KeyCode::End => *scroll_offset = usize::MAX,
        _ => {}
    }
}

/// Clamp after the row count is known.
pub fn processes_clamp(scroll_offset: &mut usize, total_rows: usize, viewport_rows: usize) {
    *scroll_offset = (*scroll_offset).min(total_rows.saturating_sub(viewport_rows));
}
