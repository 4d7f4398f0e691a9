//! Sign-in screen and the self-service registration form.

use crossterm::event::{KeyCode, KeyEvent};
use hostdash_client::types::Registration;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::form::{Field, Form};
use crate::ui::theme::MUTED;
use crate::ui::util::centered;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub on_password: bool,
    pub error: Option<String>,
    /// Non-error banner, e.g. after a registration went through.
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginInput {
    Submit,
    Quit,
    Register,
    Edited,
}

impl LoginForm {
    /// Fresh form, keeping the email and explaining why we are here.
    pub fn expired(email: &str) -> Self {
        Self {
            email: email.to_string(),
            error: Some("Session expired, please log in again".into()),
            on_password: !email.is_empty(),
            ..Self::default()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> LoginInput {
        match key.code {
            KeyCode::Esc => return LoginInput::Quit,
            KeyCode::F(2) => return LoginInput::Register,
            KeyCode::Enter if self.on_password => return LoginInput::Submit,
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
                self.on_password = !self.on_password;
            }
            KeyCode::Backspace => {
                self.field().pop();
            }
            KeyCode::Char(c) => self.field().push(c),
            _ => {}
        }
        LoginInput::Edited
    }

    fn field(&mut self) -> &mut String {
        if self.on_password {
            &mut self.password
        } else {
            &mut self.email
        }
    }
}

pub fn registration_form() -> Form {
    Form::new(
        "Create account",
        vec![
            Field::text("Username", ""),
            Field::text("Email", ""),
            Field::text("First name", ""),
            Field::text("Last name", ""),
            Field::secret("Password"),
            Field::secret("Confirm password"),
        ],
    )
}

pub fn registration_from_form(form: &Form) -> Registration {
    Registration {
        username: form.value("Username").to_string(),
        email: form.value("Email").to_string(),
        first_name: form.value("First name").to_string(),
        last_name: form.value("Last name").to_string(),
        password: form.raw("Password").to_string(),
        password2: form.raw("Confirm password").to_string(),
    }
}

pub fn draw_login(f: &mut ratatui::Frame<'_>, area: Rect, api: &str, form: &LoginForm) {
    let rect = centered(area, 50, 11);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("hostdash — sign in to {api}"));
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let field = |label: &str, value: String, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        Line::from(vec![
            Span::styled(format!("{label:<10}"), style),
            Span::raw(value),
            Span::styled(if focused { "▏" } else { "" }, Style::default().fg(Color::Cyan)),
        ])
    };
    let mut lines = vec![
        Line::from(""),
        field("Email", form.email.clone(), !form.on_password),
        field("Password", "•".repeat(form.password.chars().count()), form.on_password),
        Line::from(""),
    ];
    if let Some(err) = form.error.as_deref() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    } else if let Some(notice) = form.notice.as_deref() {
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(Color::Green),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Tab: switch field   Enter: sign in   F2: register   Esc: quit",
        Style::default().fg(MUTED),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    #[test]
    fn typing_fills_focused_field_and_enter_moves_then_submits() {
        let mut form = LoginForm::default();
        for c in "ops@x.io".chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(form.handle_key(key(KeyCode::Enter)), LoginInput::Edited);
        form.handle_key(key(KeyCode::Char('p')));
        form.handle_key(key(KeyCode::Char('w')));
        form.handle_key(key(KeyCode::Backspace));
        assert_eq!(form.email, "ops@x.io");
        assert_eq!(form.password, "p");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), LoginInput::Submit);
        assert_eq!(form.handle_key(key(KeyCode::Esc)), LoginInput::Quit);
    }

    #[test]
    fn f2_asks_for_registration_and_form_maps_fields() {
        let mut login = LoginForm::default();
        assert_eq!(login.handle_key(key(KeyCode::F(2))), LoginInput::Register);

        let mut form = registration_form();
        for (i, v) in ["ops", "ops@x.io", "Ada", "Lovelace", "hunter22 ", "hunter22"]
            .into_iter()
            .enumerate()
        {
            form.fields[i].value = v.into();
        }
        let r = registration_from_form(&form);
        assert_eq!(r.username, "ops");
        assert_eq!(r.last_name, "Lovelace");
        assert_eq!(r.password, "hunter22 ");
        let err = r.validate().unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");

        form.fields[4].value = "hunter22".into();
        assert!(registration_from_form(&form).validate().is_ok());
    }

    #[test]
    fn expired_form_keeps_email() {
        let form = LoginForm::expired("ops@x.io");
        assert!(form.on_password);
        assert!(form.error.is_some());
    }
}
