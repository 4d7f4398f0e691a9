//! In-process fake of the monitoring backend for integration tests.
//!
//! Replies are scripted per `(method, path)` and every request is recorded so
//! tests can assert on what did (or did not) reach the wire.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use hostdash_client::session::{Session, Tokens};
use hostdash_client::{ApiClient, ClientConfig};
use serde_json::Value;

const PREFIX: &str = "/api";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub csrf: Option<String>,
    pub auth: Option<String>,
    pub body: Value,
}

type Key = (String, String);

#[derive(Default)]
struct Script {
    once: HashMap<Key, VecDeque<(u16, Value)>>,
    sticky: HashMap<Key, (u16, Value)>,
    cookies: HashMap<String, String>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct Backend {
    script: Arc<Mutex<Script>>,
}

fn key(method: &str, path: &str) -> Key {
    (method.to_uppercase(), path.to_string())
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `method path` with `status` and `body`.
    pub fn reply(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .unwrap()
            .sticky
            .insert(key(method, path), (status, body));
        self
    }

    /// Answer the next `method path` only; later calls fall through to `reply`.
    pub fn reply_once(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .unwrap()
            .once
            .entry(key(method, path))
            .or_default()
            .push_back((status, body));
        self
    }

    pub fn set_cookie(&self, path: &str, cookie: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .cookies
            .insert(path.to_string(), cookie.to_string());
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Bind an ephemeral port and return the API base url.
    pub async fn serve(&self) -> String {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}{PREFIX}")
    }
}

async fn handle(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(PREFIX)
        .unwrap_or(uri.path())
        .to_string();
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = Recorded {
        method: method.as_str().to_string(),
        path: path.clone(),
        query: uri.query().unwrap_or("").to_string(),
        csrf: header_str("x-csrftoken"),
        auth: header_str("authorization"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let (reply, cookie) = {
        let mut script = backend.script.lock().unwrap();
        script.requests.push(recorded);
        let k = key(method.as_str(), &path);
        let reply = script
            .once
            .get_mut(&k)
            .and_then(VecDeque::pop_front)
            .or_else(|| script.sticky.get(&k).cloned());
        (reply, script.cookies.get(&path).cloned())
    };

    let Some((status, body)) = reply else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({"detail": "Not found."})))
            .into_response();
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else {
        (status, Json(body)).into_response()
    };
    if let Some(cookie) = cookie {
        resp.headers_mut()
            .insert(header::SET_COOKIE, cookie.parse().unwrap());
    }
    resp
}

pub fn client(base: &str) -> ApiClient {
    ApiClient::new(ClientConfig::new(base)).unwrap()
}

pub fn authed_client(base: &str, access: &str, refresh: &str) -> ApiClient {
    let session = Session::with_tokens(Tokens {
        access: access.into(),
        refresh: Some(refresh.into()),
    });
    ApiClient::with_session(ClientConfig::new(base), session).unwrap()
}

pub fn alert_json(id: i64) -> Value {
    serde_json::json!({
        "id": id,
        "title": format!("alert {id}"),
        "level": "high",
        "alert_type": "resource",
        "resolved": false,
        "triggered_at": "2024-05-01T10:00:00Z",
        "agent_hostname": "web-1",
    })
}

pub fn agent_json(id: i64, approved: bool) -> Value {
    serde_json::json!({
        "id": id,
        "hostname": format!("host-{id}"),
        "username": "root",
        "ip_address": "10.0.0.5",
        "is_active": true,
        "is_approved": approved,
        "last_seen": "2024-05-01T10:00:00Z",
    })
}
