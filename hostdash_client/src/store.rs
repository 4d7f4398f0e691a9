//! Shared polling snapshot of agents, alerts, stats and metrics.
//!
//! The store is the only owner of its snapshot: views read clones of it and
//! never write to it. Every resource is refetched independently; whichever
//! response lands last wins, and a failed fetch only resets its own resource.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::types::{Agent, AgentStats, Alert, AlertFilters, AlertId, MetricSample, MetricsQuery};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// How many of the newest alerts the overview keeps.
pub const OVERVIEW_ALERT_LIMIT: u32 = 100;

/// Where the store gets its data. `ApiClient` in the app, fakes in tests.
#[async_trait]
pub trait DashboardSource: Send + Sync + 'static {
    async fn load_agents(&self) -> ApiResult<Vec<Agent>>;
    async fn load_alerts(&self) -> ApiResult<Vec<Alert>>;
    async fn load_stats(&self) -> ApiResult<AgentStats>;
    async fn load_metrics(&self, query: MetricsQuery) -> ApiResult<Vec<MetricSample>>;
    async fn resolve(&self, id: AlertId) -> ApiResult<()>;
}

#[async_trait]
impl DashboardSource for ApiClient {
    async fn load_agents(&self) -> ApiResult<Vec<Agent>> {
        self.try_list_agents().await
    }

    async fn load_alerts(&self) -> ApiResult<Vec<Alert>> {
        let page = self
            .try_list_alerts(&AlertFilters::default(), 1, OVERVIEW_ALERT_LIMIT)
            .await?;
        Ok(page.items)
    }

    async fn load_stats(&self) -> ApiResult<AgentStats> {
        self.try_agent_stats().await
    }

    async fn load_metrics(&self, query: MetricsQuery) -> ApiResult<Vec<MetricSample>> {
        self.try_metrics(&query).await
    }

    async fn resolve(&self, id: AlertId) -> ApiResult<()> {
        self.resolve_alert(id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Agents,
    Alerts,
    Stats,
    Metrics,
}

impl Resource {
    pub fn label(self) -> &'static str {
        match self {
            Resource::Agents => "agents",
            Resource::Alerts => "alerts",
            Resource::Stats => "stats",
            Resource::Metrics => "metrics",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Refreshing,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub agents: Vec<Agent>,
    pub alerts: Vec<Alert>,
    pub stats: AgentStats,
    pub metrics: Vec<MetricSample>,
    pub status: StoreStatus,
    /// Last failure per resource; cleared by that resource's next success.
    pub errors: BTreeMap<Resource, String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_loading(&self) -> bool {
        matches!(self.status, StoreStatus::Uninitialized | StoreStatus::Loading)
    }

    pub fn error(&self) -> Option<String> {
        self.errors
            .iter()
            .next()
            .map(|(res, msg)| format!("Failed to fetch {}: {msg}", res.label()))
    }
}

struct Shared<S> {
    source: S,
    interval: Duration,
    snapshot: RwLock<Snapshot>,
    metrics_query: RwLock<MetricsQuery>,
    closed: AtomicBool,
    changes: watch::Sender<u64>,
}

impl<S: DashboardSource> Shared<S> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn set_status(&self, status: StoreStatus) {
        if self.is_closed() {
            return;
        }
        self.snapshot.write().await.status = status;
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    // Fetch-completion path; the only place the snapshot's data changes.
    async fn apply<T: Default>(
        &self,
        resource: Resource,
        result: ApiResult<T>,
        store: impl FnOnce(&mut Snapshot, T),
    ) {
        if self.is_closed() {
            debug!(resource = resource.label(), "store closed, dropping late response");
            return;
        }
        let mut snap = self.snapshot.write().await;
        match result {
            Ok(value) => {
                snap.errors.remove(&resource);
                store(&mut snap, value);
            }
            Err(e) => {
                warn!(resource = resource.label(), error = %e, "fetch failed");
                snap.errors.insert(resource, e.user_message());
                store(&mut snap, T::default());
            }
        }
        snap.updated_at = Some(Utc::now());
        drop(snap);
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    async fn fetch_agents(&self) {
        let result = self.source.load_agents().await;
        self.apply(Resource::Agents, result, |s, v| s.agents = v).await;
    }

    async fn fetch_alerts(&self) {
        let result = self.source.load_alerts().await;
        self.apply(Resource::Alerts, result, |s, v| s.alerts = v).await;
    }

    async fn fetch_stats(&self) {
        let result = self.source.load_stats().await;
        self.apply(Resource::Stats, result, |s, v| s.stats = v).await;
    }

    async fn fetch_metrics(&self) {
        let query = *self.metrics_query.read().await;
        let result = self.source.load_metrics(query).await;
        self.apply(Resource::Metrics, result, |s, v| s.metrics = v).await;
    }

    async fn fetch_all(&self) {
        tokio::join!(
            self.fetch_agents(),
            self.fetch_alerts(),
            self.fetch_stats(),
            self.fetch_metrics()
        );
    }

    async fn load(&self) {
        self.set_status(StoreStatus::Loading).await;
        self.fetch_all().await;
        self.set_status(StoreStatus::Ready).await;
    }

    async fn refresh_all(&self) {
        let status = self.snapshot.read().await.status;
        if status == StoreStatus::Uninitialized {
            return self.load().await;
        }
        self.set_status(StoreStatus::Refreshing).await;
        self.fetch_all().await;
        self.set_status(StoreStatus::Ready).await;
    }
}

/// Owner of the snapshot and its polling task. Dropping it stops polling.
pub struct PollingStore<S: DashboardSource> {
    shared: Arc<Shared<S>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<S: DashboardSource> PollingStore<S> {
    pub fn new(source: S) -> Self {
        Self::with_interval(source, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(source: S, interval: Duration) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                source,
                interval,
                snapshot: RwLock::new(Snapshot::default()),
                metrics_query: RwLock::new(MetricsQuery::default()),
                closed: AtomicBool::new(false),
                changes,
            }),
            poller: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// Spawn the initial load followed by a refresh every interval.
    /// Calling it again while polling is a no-op.
    pub fn start(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if poller.is_some() || self.shared.is_closed() {
            return;
        }
        let shared = self.shared.clone();
        *poller = Some(tokio::spawn(async move {
            shared.load().await;
            let period = shared.interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if shared.is_closed() {
                    break;
                }
                shared.refresh_all().await;
            }
        }));
        info!(interval_secs = self.shared.interval.as_secs_f64(), "polling started");
    }

    /// Fetch all four resources concurrently; `loading` clears once all settle.
    pub async fn load(&self) {
        self.shared.load().await;
    }

    /// Manual refresh. Not deduplicated against the poller.
    pub async fn refresh_all(&self) {
        self.shared.refresh_all().await;
    }

    pub async fn fetch_agents(&self) {
        self.shared.fetch_agents().await;
    }

    pub async fn fetch_alerts(&self) {
        self.shared.fetch_alerts().await;
    }

    pub async fn fetch_stats(&self) {
        self.shared.fetch_stats().await;
    }

    pub async fn fetch_metrics(&self) {
        self.shared.fetch_metrics().await;
    }

    /// Resolve through the source, then refetch alerts. Errors propagate and
    /// skip the refetch.
    pub async fn resolve_alert(&self, id: AlertId) -> ApiResult<()> {
        self.shared.source.resolve(id).await?;
        self.shared.fetch_alerts().await;
        Ok(())
    }

    /// Which agent/time window the metrics resource follows.
    pub async fn set_metrics_query(&self, query: MetricsQuery) {
        *self.shared.metrics_query.write().await = query;
    }

    pub async fn metrics_query(&self) -> MetricsQuery {
        *self.shared.metrics_query.read().await
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&*self.shared.snapshot.read().await)
    }

    /// Bumped on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .map(|p| p.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop polling. Responses still in flight are discarded when they land.
    pub fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let handle = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("polling stopped");
        }
    }
}

impl<S: DashboardSource> Drop for PollingStore<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    fn agent(id: i64) -> Agent {
        serde_json::from_value(serde_json::json!({"id": id, "hostname": format!("h{id}")}))
            .unwrap()
    }

    fn alert(id: i64) -> Alert {
        serde_json::from_value(serde_json::json!({"id": id, "title": "t"})).unwrap()
    }

    fn down() -> ApiError {
        ApiError::Decode("backend down".into())
    }

    #[derive(Default)]
    struct FakeSource {
        // (delay ms, agent id) per call; default reply afterwards
        agent_replies: Mutex<VecDeque<(u64, i64)>>,
        agent_calls: AtomicUsize,
        alert_calls: AtomicUsize,
        stats_delay_ms: u64,
        fail_stats: AtomicBool,
        fail_resolve: bool,
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn load_agents(&self) -> ApiResult<Vec<Agent>> {
            self.agent_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.agent_replies.lock().unwrap().pop_front();
            let (delay, id) = next.unwrap_or((0, 100));
            sleep(Duration::from_millis(delay)).await;
            Ok(vec![agent(id)])
        }

        async fn load_alerts(&self) -> ApiResult<Vec<Alert>> {
            self.alert_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![alert(1), alert(2)])
        }

        async fn load_stats(&self) -> ApiResult<AgentStats> {
            sleep(Duration::from_millis(self.stats_delay_ms)).await;
            if self.fail_stats.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(AgentStats {
                total_agents: 3,
                ..AgentStats::default()
            })
        }

        async fn load_metrics(&self, query: MetricsQuery) -> ApiResult<Vec<MetricSample>> {
            if query.agent_id.is_none() {
                return Ok(Vec::new());
            }
            Ok(vec![serde_json::from_value(serde_json::json!({
                "timestamp": "2024-05-01T10:00:00Z", "cpu_usage": 12.5
            }))
            .unwrap()])
        }

        async fn resolve(&self, _id: AlertId) -> ApiResult<()> {
            if self.fail_resolve {
                Err(down())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn initial_load_fills_every_resource() {
        let store = PollingStore::new(FakeSource::default());
        store
            .set_metrics_query(MetricsQuery::for_agent(7, 1))
            .await;
        assert!(store.snapshot().await.is_loading());
        store.load().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.status, StoreStatus::Ready);
        assert_eq!(snap.agents.len(), 1);
        assert_eq!(snap.alerts.len(), 2);
        assert_eq!(snap.stats.total_agents, 3);
        assert_eq!(snap.metrics.len(), 1);
        assert!(snap.error().is_none());
    }

    #[tokio::test]
    async fn loading_clears_only_when_slowest_fetch_settles() {
        let store = PollingStore::with_interval(
            FakeSource {
                stats_delay_ms: 80,
                ..FakeSource::default()
            },
            Duration::from_secs(3600),
        );
        store.start();
        sleep(Duration::from_millis(20)).await;
        let early = store.snapshot().await;
        assert_eq!(early.status, StoreStatus::Loading);
        assert_eq!(early.agents.len(), 1, "fast fetches land independently");

        sleep(Duration::from_millis(150)).await;
        assert_eq!(store.snapshot().await.status, StoreStatus::Ready);
    }

    #[tokio::test]
    async fn failure_resets_only_the_failed_resource() {
        let store = PollingStore::new(FakeSource::default());
        store.load().await;
        store.source().fail_stats.store(true, Ordering::SeqCst);
        store.refresh_all().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.stats, AgentStats::default());
        assert_eq!(snap.agents.len(), 1);
        assert_eq!(snap.alerts.len(), 2);
        assert!(snap.errors.contains_key(&Resource::Stats));
        assert!(snap.error().unwrap().contains("stats"));

        store.source().fail_stats.store(false, Ordering::SeqCst);
        store.fetch_stats().await;
        assert!(store.snapshot().await.error().is_none());
    }

    #[tokio::test]
    async fn last_resolved_response_wins() {
        let source = FakeSource::default();
        // first issued is slow, second is fast
        source
            .agent_replies
            .lock()
            .unwrap()
            .extend([(60, 1), (0, 2)]);
        let store = PollingStore::new(source);

        tokio::join!(store.fetch_agents(), async {
            sleep(Duration::from_millis(10)).await;
            store.fetch_agents().await;
        });

        let ids: Vec<i64> = store.read(|s| s.agents.iter().map(|a| a.id).collect()).await;
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn resolve_refetches_alerts_only_on_success() {
        let store = PollingStore::new(FakeSource::default());
        store.resolve_alert(1).await.unwrap();
        assert_eq!(store.source().alert_calls.load(Ordering::SeqCst), 1);

        let failing = PollingStore::new(FakeSource {
            fail_resolve: true,
            ..FakeSource::default()
        });
        assert!(failing.resolve_alert(1).await.is_err());
        assert_eq!(failing.source().alert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn polling_stops_after_shutdown() {
        let store = PollingStore::with_interval(FakeSource::default(), Duration::from_millis(20));
        store.start();
        assert!(store.is_polling());
        sleep(Duration::from_millis(110)).await;
        let calls = store.source().agent_calls.load(Ordering::SeqCst);
        assert!(calls >= 3, "expected repeated polls, got {calls}");

        store.shutdown();
        assert!(!store.is_polling());
        let frozen = store.source().agent_calls.load(Ordering::SeqCst);
        sleep(Duration::from_millis(80)).await;
        assert_eq!(store.source().agent_calls.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test]
    async fn response_after_shutdown_is_dropped() {
        let source = FakeSource::default();
        source.agent_replies.lock().unwrap().push_back((50, 9));
        let store = PollingStore::new(source);

        tokio::join!(store.fetch_agents(), async {
            sleep(Duration::from_millis(10)).await;
            store.shutdown();
        });
        assert!(store.snapshot().await.agents.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = PollingStore::new(FakeSource::default());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());
        store.fetch_alerts().await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
    }
}
