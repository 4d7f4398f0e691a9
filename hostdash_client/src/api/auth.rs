//! Login, registration, logout, token refresh and anti-forgery token bootstrap.

use serde_json::json;
use tracing::{info, warn};

use super::{read_body, require_text, ApiClient, Call};
use crate::error::{ApiError, ApiResult};
use crate::session::Tokens;
use crate::types::{CsrfResponse, LoginResponse, RefreshResponse, Registration};

pub const CSRF_HEADER: &str = "X-CSRFToken";

impl ApiClient {
    /// `POST /auth/login/`; stores the returned token pair in the session.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        let email = require_text(email, "email")?;
        if password.is_empty() {
            return Err(ApiError::validation("Please provide a password"));
        }
        // No refresh-retry here: a 401 means bad credentials.
        let call = Call::post("auth/login/").json(json!({ "email": email, "password": password }));
        let resp = self.dispatch(&call).await?;
        let body: LoginResponse = serde_json::from_value(read_body(resp).await?)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.session
            .set_tokens(Tokens {
                access: body.access,
                refresh: body.refresh,
            })
            .await;
        info!(%email, "logged in");
        Ok(())
    }

    /// `POST /auth/register/`. The account stays inactive until an admin approves it.
    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        registration.validate()?;
        let body = serde_json::to_value(registration).map_err(|e| ApiError::Decode(e.to_string()))?;
        // No session yet, so no refresh-retry.
        let resp = self.dispatch(&Call::post("auth/register/").json(body)).await?;
        read_body(resp).await?;
        info!(username = %registration.username, "registration submitted");
        Ok(())
    }

    /// Best-effort server logout; the local session is cleared regardless.
    pub async fn logout(&self) {
        if let Some(refresh) = self.session.refresh_token().await {
            let call = Call::post("auth/logout/").json(json!({ "refresh_token": refresh }));
            if let Err(e) = self.dispatch(&call).await {
                warn!(error = %e, "logout request failed");
            }
        }
        self.session.clear().await;
    }

    /// Exchange the refresh token for a new access token. Any failure is fatal
    /// for the session: credentials are dropped and `SessionExpired` returned.
    pub async fn refresh_access(&self) -> ApiResult<()> {
        let Some(refresh) = self.session.refresh_token().await else {
            self.session.clear().await;
            return Err(ApiError::SessionExpired);
        };
        let call = Call::post("auth/refresh/").json(json!({ "refresh": refresh }));
        let renewed = match self.dispatch(&call).await {
            Ok(resp) => read_body(resp)
                .await
                .and_then(|v| {
                    serde_json::from_value::<RefreshResponse>(v)
                        .map_err(|e| ApiError::Decode(e.to_string()))
                }),
            Err(e) => Err(e),
        };
        match renewed {
            Ok(body) => {
                self.session.renew(body.access, body.refresh).await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.session.clear().await;
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// `GET /csrf/` so the backend sets its cookie. Never fails the caller; a
    /// missing token only means writes go out without the header.
    pub async fn initialize_csrf(&self) -> bool {
        match self.fetch(Call::get("csrf/")).await {
            Ok(v) => {
                let body: CsrfResponse = serde_json::from_value(v).unwrap_or_default();
                if let Some(token) = body.csrf_token.filter(|t| !t.is_empty()) {
                    self.session.set_csrf(token).await;
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "CSRF initialization failed, continuing without it");
                false
            }
        }
    }
}
