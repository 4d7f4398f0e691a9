//! Error type shared by every client call.

use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Refused before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// Bulk action whose selection no longer matches the rendered page.
    #[error("{0}")]
    StaleSelection(String),

    #[error("session expired, please log in again")]
    SessionExpired,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// True when the error was raised locally and no request reached the server.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ApiError::Validation(_) | ApiError::StaleSelection(_) | ApiError::Config(_)
        )
    }

    /// Short text suitable for a one-line banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status, body } => {
                let detail = extract_detail(body).unwrap_or_else(|| status.to_string());
                format!("Request failed ({}): {detail}", status.as_u16())
            }
            ApiError::Transport(e) if e.is_timeout() => "Request timed out".into(),
            ApiError::Transport(_) => "Could not reach the server".into(),
            other => other.to_string(),
        }
    }
}

// Backend error bodies look like {"error": "..."} or {"detail": "..."}.
fn extract_detail(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "detail", "message"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|s| s.as_str()).map(str::to_string))
        .or_else(|| field_error(&v))
}

// Form validation errors: {"password": ["This password is too common."]}.
fn field_error(v: &serde_json::Value) -> Option<String> {
    v.as_object()?.iter().find_map(|(field, msgs)| {
        let msg = match msgs {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Array(items) => items.first().and_then(|m| m.as_str()),
            _ => None,
        }?;
        Some(format!("{field}: {msg}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_prefers_backend_detail() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"Agent with this hostname already exists"}"#.into(),
        };
        assert_eq!(
            err.user_message(),
            "Request failed (400): Agent with this hostname already exists"
        );
    }

    #[test]
    fn status_message_falls_back_to_status_text() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "<html>oops</html>".into(),
        };
        assert!(err.user_message().contains("500"));
    }

    #[test]
    fn field_errors_name_the_field() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"username":["A user with that username already exists."]}"#.into(),
        };
        assert_eq!(
            err.user_message(),
            "Request failed (400): username: A user with that username already exists."
        );
    }

    #[test]
    fn local_errors_are_client_side() {
        assert!(ApiError::validation("x").is_client_side());
        assert!(ApiError::StaleSelection("x".into()).is_client_side());
        assert!(!ApiError::SessionExpired.is_client_side());
    }
}
