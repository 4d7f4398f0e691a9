//! HTTP client for the monitoring backend.
//!
//! Every outbound call goes through [`ApiClient::send`], which attaches the bearer
//! token and the anti-forgery header, and performs at most one refresh-and-retry
//! on a 401. Reads built on top of it degrade to empty values; writes return
//! errors (see the per-resource modules).

mod agents;
mod alerts;
mod auth;
mod metrics;
mod registrations;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::session::Session;

pub use alerts::DEFAULT_ALERT_PAGE_SIZE;
pub use auth::CSRF_HEADER;
pub use metrics::DEFAULT_PROCESS_PAGE_SIZE;
pub use registrations::Approval;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    /// Extra PEM root certificate for self-signed backends.
    pub tls_ca: Option<PathBuf>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tls_ca: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_tls_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One logical request, replayable for the post-refresh retry.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Call {
    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(path)
        }
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self {
            method: Method::PUT,
            ..Self::get(path)
        }
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            ..Self::get(path)
        }
    }

    pub(crate) fn query(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub(crate) fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn is_mutating(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD && self.method != Method::OPTIONS
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    jar: Arc<Jar>,
    session: Session,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::with_session(config, Session::default())
    }

    pub fn with_session(config: ClientConfig, session: Session) -> ApiResult<Self> {
        let mut base = Url::parse(config.base_url.trim()).map_err(|e| {
            ApiError::Config(format!("invalid API url {:?}: {e}", config.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "API url must be http(s), got {}",
                base.scheme()
            )));
        }
        // Url::join drops the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.timeout);
        if let Some(ca) = config.tls_ca.as_ref() {
            let pem = std::fs::read(ca)
                .map_err(|e| ApiError::Config(format!("reading CA {}: {e}", ca.display())))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ApiError::Config(format!("parsing CA {}: {e}", ca.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Config(format!("HTTP client init: {e}")))?;

        Ok(Self {
            http,
            base,
            jar,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("bad endpoint {path:?}: {e}")))
    }

    /// Token from the `csrftoken` cookie, else the one `/csrf/` handed back.
    pub async fn csrf_token(&self) -> Option<String> {
        let from_cookie = self.jar.cookies(&self.base).and_then(|header| {
            header.to_str().ok().and_then(|raw| {
                raw.split(';')
                    .filter_map(|kv| kv.trim().split_once('='))
                    .find(|(k, _)| *k == "csrftoken")
                    .map(|(_, v)| v.to_string())
            })
        });
        match from_cookie {
            Some(t) if !t.is_empty() => Some(t),
            _ => self.session.csrf().await,
        }
    }

    // Single attempt with current credentials.
    async fn dispatch(&self, call: &Call) -> ApiResult<Response> {
        let url = self.endpoint(&call.path)?;
        let mut req = self.http.request(call.method.clone(), url);
        if !call.query.is_empty() {
            req = req.query(&call.query);
        }
        if let Some(token) = self.session.access_token().await {
            req = req.bearer_auth(token);
        }
        if call.is_mutating() {
            if let Some(csrf) = self.csrf_token().await {
                req = req.header(CSRF_HEADER, csrf);
            }
        }
        if let Some(body) = call.body.as_ref() {
            req = req.json(body);
        }
        debug!(method = %call.method, path = %call.path, "dispatch");
        Ok(req.send().await?)
    }

    /// Dispatch, and on a 401 refresh once and retry once.
    pub(crate) async fn send(&self, call: &Call) -> ApiResult<Response> {
        let resp = self.dispatch(call).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }
        debug!(path = %call.path, "401, refreshing access token");
        self.refresh_access().await?;
        self.dispatch(call).await
    }

    pub(crate) async fn fetch(&self, call: Call) -> ApiResult<Value> {
        let resp = self.send(&call).await?;
        read_body(resp).await
    }

    pub(crate) async fn fetch_as<T: DeserializeOwned>(&self, call: Call) -> ApiResult<T> {
        let value = self.fetch(call).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Non-2xx becomes `ApiError::Status`; empty bodies and 204 read as `null`.
pub(crate) async fn read_body(resp: Response) -> ApiResult<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Read-side policy: log and fall back instead of surfacing the failure.
pub(crate) fn degrade<T>(what: &str, result: ApiResult<T>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            warn!(resource = what, error = %e, "read failed, using empty value");
            fallback()
        }
    }
}

/// Refuse blank free-text before any request is built.
pub(crate) fn require_text(value: &str, what: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("Please provide a {what}")));
    }
    Ok(trimmed.to_string())
}
