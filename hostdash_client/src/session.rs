//! In-memory session: bearer/refresh tokens and the last anti-forgery token.
//!
//! Lives only as long as the process, the terminal equivalent of
//! session-scoped browser storage.

use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    tokens: Option<Tokens>,
    csrf: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                tokens: Some(tokens),
                csrf: None,
            })),
        }
    }

    pub async fn set_tokens(&self, tokens: Tokens) {
        self.inner.write().await.tokens = Some(tokens);
    }

    pub async fn tokens(&self) -> Option<Tokens> {
        self.inner.read().await.tokens.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .tokens
            .as_ref()
            .map(|t| t.access.clone())
            .filter(|t| !t.is_empty())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .tokens
            .as_ref()
            .and_then(|t| t.refresh.clone())
            .filter(|t| !t.is_empty())
    }

    /// Replace the access token after a refresh; a rotated refresh token wins too.
    pub async fn renew(&self, access: String, refresh: Option<String>) {
        let mut st = self.inner.write().await;
        match st.tokens.as_mut() {
            Some(t) => {
                t.access = access;
                if refresh.is_some() {
                    t.refresh = refresh;
                }
            }
            None => st.tokens = Some(Tokens { access, refresh }),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some()
    }

    pub async fn set_csrf(&self, token: String) {
        self.inner.write().await.csrf = Some(token);
    }

    pub async fn csrf(&self) -> Option<String> {
        self.inner.read().await.csrf.clone()
    }

    /// Drop every credential. Called on logout and when a refresh fails.
    pub async fn clear(&self) {
        let mut st = self.inner.write().await;
        st.tokens = None;
        st.csrf = None;
    }
}
