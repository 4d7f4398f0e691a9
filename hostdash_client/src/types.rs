//! Types that mirror the monitoring backend's JSON schema.
//!
//! Everything here is a transient snapshot of server-owned data. Decoding is
//! lenient: missing or null fields fall back to defaults so one odd row never
//! empties a whole list.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

pub type AgentId = i64;
pub type AlertId = i64;
pub type RequestId = i64;

fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

// Accepts RFC 3339 as well as naive timestamps (treated as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_time<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?
        .as_deref()
        .and_then(parse_timestamp))
}

fn required_time<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

// ---------- Agents & registration ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub hostname: String,
    #[serde(default, deserialize_with = "null_default")]
    pub username: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default, deserialize_with = "lenient_time")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub monitoring_scope: String,
    #[serde(default, deserialize_with = "null_default")]
    pub log_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub id: RequestId,
    pub hostname: String,
    #[serde(default, deserialize_with = "null_default")]
    pub username: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub requested_at: Option<DateTime<Utc>>,
}

/// Summary counters from `/agents/stats/`. Missing counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStats {
    pub total_agents: u64,
    pub active_agents: u64,
    pub pending_registrations: u64,
    pub recent_logs_count: u64,
    pub alerts_count: u64,
}

// ---------- Alerts ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Low,
        AlertLevel::Medium,
        AlertLevel::High,
        AlertLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
            AlertLevel::Unknown => "unknown",
        }
    }

    /// Severity rank used for sorting, higher is worse.
    pub fn rank(self) -> u8 {
        match self {
            AlertLevel::Unknown => 0,
            AlertLevel::Low => 1,
            AlertLevel::Medium => 2,
            AlertLevel::High => 3,
            AlertLevel::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Process,
    Network,
    Authentication,
    Resource,
    Security,
    #[default]
    System,
    #[serde(other)]
    Unknown,
}

impl AlertType {
    pub const ALL: [AlertType; 6] = [
        AlertType::Process,
        AlertType::Network,
        AlertType::Authentication,
        AlertType::Resource,
        AlertType::Security,
        AlertType::System,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Process => "process",
            AlertType::Network => "network",
            AlertType::Authentication => "authentication",
            AlertType::Resource => "resource",
            AlertType::Security => "security",
            AlertType::System => "system",
            AlertType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub level: AlertLevel,
    #[serde(default, deserialize_with = "null_default")]
    pub alert_type: AlertType,
    #[serde(default, deserialize_with = "null_default")]
    pub resolved: bool,
    #[serde(default, deserialize_with = "lenient_time")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agent_hostname: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub notes: String,
    /// Process name, source/destination IP, port, user, current value...
    #[serde(default, deserialize_with = "null_default")]
    pub metadata: Map<String, Value>,
}

impl Alert {
    /// Optimistic resolve. A server-side `resolved_at` is never replaced; `now`
    /// only fills the gap until the next fetch.
    pub fn mark_resolved(&mut self, now: DateTime<Utc>) {
        self.resolved = true;
        if self.resolved_at.is_none() {
            self.resolved_at = Some(now);
        }
    }

    pub fn mark_unresolved(&mut self) {
        self.resolved = false;
        self.resolved_at = None;
    }

    pub fn append_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(note);
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Alert list filters. `None` and empty values never reach the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilters {
    pub resolved: Option<bool>,
    pub level: Option<AlertLevel>,
    pub agent: Option<String>,
    pub alert_type: Option<AlertType>,
}

impl AlertFilters {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(resolved) = self.resolved {
            out.push(("resolved", resolved.to_string()));
        }
        if let Some(level) = self.level.filter(|l| *l != AlertLevel::Unknown) {
            out.push(("level", level.as_str().to_string()));
        }
        if let Some(agent) = self.agent.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            out.push(("agent", agent.to_string()));
        }
        if let Some(kind) = self.alert_type.filter(|t| *t != AlertType::Unknown) {
            out.push(("alert_type", kind.as_str().to_string()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BulkResult {
    #[serde(default)]
    pub message: String,
}

// ---------- Pagination ----------

/// Count-based pagination normalized from the backend's `{results, count, next, previous}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl Pagination {
    pub fn from_count(
        current: u32,
        page_size: u32,
        total: u64,
        next: Option<String>,
        previous: Option<String>,
    ) -> Self {
        let page_size = page_size.max(1);
        Self {
            current: current.max(1),
            page_size,
            total,
            total_pages: pages_for(total, page_size),
            next,
            previous,
        }
    }

    pub fn empty(page_size: u32) -> Self {
        Self::from_count(1, page_size, 0, None, None)
    }

    /// Local bookkeeping after rows were deleted, pending the next fetch.
    pub fn remove_rows(&mut self, n: u64) {
        self.total = self.total.saturating_sub(n);
        self.total_pages = pages_for(self.total, self.page_size);
    }
}

fn pages_for(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::empty(page_size),
        }
    }
}

// ---------- Metrics & processes ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(deserialize_with = "required_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub disk_usage: Option<f64>,
    #[serde(default)]
    pub network_sent: Option<u64>,
    #[serde(default)]
    pub network_received: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsQuery {
    pub agent_id: Option<AgentId>,
    pub hours: Option<u32>,
}

impl MetricsQuery {
    pub fn for_agent(agent_id: AgentId, hours: u32) -> Self {
        Self {
            agent_id: Some(agent_id),
            hours: Some(hours),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(id) = self.agent_id {
            out.push(("agent_id", id.to_string()));
        }
        if let Some(hours) = self.hours {
            out.push(("hours", hours.to_string()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessEntry {
    pub pid: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub user: String,
    #[serde(deserialize_with = "null_default")]
    pub cpu_percent: f64,
    #[serde(deserialize_with = "null_default")]
    pub memory_percent: f64,
    pub is_root: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSnapshot {
    pub hostname: String,
    #[serde(deserialize_with = "lenient_time")]
    pub timestamp: Option<DateTime<Utc>>,
    pub total_processes: u64,
    pub root_processes: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    #[serde(deserialize_with = "null_default")]
    pub top_cpu_processes: Vec<ProcessEntry>,
    #[serde(deserialize_with = "null_default")]
    pub top_memory_processes: Vec<ProcessEntry>,
    #[serde(deserialize_with = "null_default")]
    pub load_average: Vec<f64>,
}

impl ProcessSnapshot {
    /// Zeroed snapshot handed to views when the backend cannot be read.
    pub fn empty(hostname: &str, page_size: u32) -> Self {
        Self {
            hostname: hostname.to_string(),
            timestamp: Some(Utc::now()),
            page: 1,
            page_size,
            ..Self::default()
        }
    }
}

// ---------- Settings ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cpu,
    Memory,
    Disk,
    Network,
    Process,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Cpu,
        ResourceType::Memory,
        ResourceType::Disk,
        ResourceType::Network,
        ResourceType::Process,
    ];

    fn is_percentage(self) -> bool {
        matches!(self, ResourceType::Cpu | ResourceType::Memory | ResourceType::Disk)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Cpu => "cpu",
            ResourceType::Memory => "memory",
            ResourceType::Disk => "disk",
            ResourceType::Network => "network",
            ResourceType::Process => "process",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [Comparison::GreaterThan, Comparison::LessThan, Comparison::Equal];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
            Comparison::Equal => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub resource_type: ResourceType,
    pub threshold_value: f64,
    pub comparison: Comparison,
    #[serde(default)]
    pub process_name: Option<String>,
    /// Seconds the condition must hold.
    pub duration: u32,
    pub is_active: bool,
}

impl Threshold {
    pub fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Threshold name is required"));
        }
        if !self.threshold_value.is_finite() || self.threshold_value < 0.0 {
            return Err(ApiError::validation(
                "Threshold value must be a non-negative number",
            ));
        }
        if self.resource_type.is_percentage() && self.threshold_value > 100.0 {
            return Err(ApiError::validation(format!(
                "{} threshold is a percentage (0-100)",
                self.resource_type.as_str()
            )));
        }
        let has_process = self
            .process_name
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if self.resource_type == ResourceType::Process && !has_process {
            return Err(ApiError::validation(
                "Process name is required for process thresholds",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Discord,
    Webhook,
}

impl ChannelType {
    pub const ALL: [ChannelType; 3] = [ChannelType::Email, ChannelType::Discord, ChannelType::Webhook];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Discord => "discord",
            ChannelType::Webhook => "webhook",
        }
    }
}

/// Channel settings; which fields matter depends on the channel type.
/// Keys this client does not know are carried in `extra` and sent back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub channel_type: ChannelType,
    #[serde(default, deserialize_with = "null_default")]
    pub config: ChannelConfig,
    pub is_active: bool,
}

fn blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl NotificationChannel {
    pub fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Channel name is required"));
        }
        let c = &self.config;
        match self.channel_type {
            ChannelType::Email => {
                if blank(&c.smtp_server) || blank(&c.email) || c.port.is_none() {
                    return Err(ApiError::validation(
                        "Email channels need an SMTP server, port and address",
                    ));
                }
            }
            ChannelType::Discord | ChannelType::Webhook => {
                let url = c.webhook_url.as_deref().unwrap_or("").trim();
                if url.is_empty() {
                    return Err(ApiError::validation("Webhook URL is required"));
                }
                if url::Url::parse(url).is_err() {
                    return Err(ApiError::validation(format!("Invalid webhook URL: {url}")));
                }
            }
        }
        Ok(())
    }
}

// ---------- Auth ----------

/// Self-service account request; an administrator approves it before login works.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password2: String,
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl Registration {
    pub fn validate(&self) -> ApiResult<()> {
        if self.username.trim().is_empty() {
            return Err(ApiError::validation("Username is required"));
        }
        if self.email.trim().is_empty() {
            return Err(ApiError::validation("Email is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.password2 {
            return Err(ApiError::validation("Passwords do not match"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CsrfResponse {
    #[serde(default, rename = "csrfToken")]
    pub csrf_token: Option<String>,
}
