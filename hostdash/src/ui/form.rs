//! Multi-field form overlay: text, masked and pick-one fields.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::ui::theme::MUTED;
use crate::ui::util::centered;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Secret,
        }
    }

    /// Falls back to the first option when `current` is not one of them.
    pub fn choice(label: &'static str, options: &'static [&'static str], current: &str) -> Self {
        let value = options
            .iter()
            .find(|o| **o == current)
            .or(options.first())
            .copied()
            .unwrap_or_default();
        Self {
            label,
            value: value.to_string(),
            kind: FieldKind::Choice(options),
        }
    }

    fn cycle(&mut self, forward: bool) {
        let FieldKind::Choice(options) = self.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let at = options.iter().position(|o| *o == self.value).unwrap_or(0);
        let next = if forward {
            (at + 1) % options.len()
        } else {
            (at + options.len() - 1) % options.len()
        };
        self.value = options[next].to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInput {
    Submit,
    Cancel,
    Edited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub fields: Vec<Field>,
    pub focus: usize,
    pub error: Option<String>,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
            focus: 0,
            error: None,
        }
    }

    /// Trimmed value of the field labelled `label`; empty if there is none.
    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    /// Raw value, for secrets where whitespace counts.
    pub fn raw(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormInput {
        let n = self.fields.len().max(1);
        match key.code {
            KeyCode::Esc => return FormInput::Cancel,
            KeyCode::Enter => return FormInput::Submit,
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % n,
            KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + n - 1) % n,
            code => {
                let Some(field) = self.fields.get_mut(self.focus) else {
                    return FormInput::Edited;
                };
                let choice = matches!(field.kind, FieldKind::Choice(_));
                match (choice, code) {
                    (true, KeyCode::Left) => field.cycle(false),
                    (true, KeyCode::Right | KeyCode::Char(' ')) => field.cycle(true),
                    (true, _) => {}
                    (_, KeyCode::Backspace) => {
                        field.value.pop();
                    }
                    (_, KeyCode::Char(c)) => field.value.push(c),
                    _ => {}
                }
            }
        }
        FormInput::Edited
    }
}

pub fn draw_form(f: &mut ratatui::Frame<'_>, area: Rect, form: &Form) {
    let height = form.fields.len() as u16 + 6;
    let rect = centered(area, 60, height);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(form.title.clone());
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let mut lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == form.focus;
            let label_style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            };
            let shown = match field.kind {
                FieldKind::Secret => "•".repeat(field.value.chars().count()),
                FieldKind::Choice(_) => format!("‹ {} ›", field.value),
                FieldKind::Text => field.value.clone(),
            };
            Line::from(vec![
                Span::styled(format!("{:<16}", field.label), label_style),
                Span::raw(shown),
                Span::styled(if focused { "▏" } else { "" }, Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    if let Some(err) = form.error.as_deref() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Tab/↑↓ field   ←→ choose   Enter save   Esc cancel",
        Style::default().fg(MUTED),
    )));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}
