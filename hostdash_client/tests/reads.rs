//! Read endpoints: shape normalization and degrade-to-empty on failure.

mod common;

use common::{agent_json, alert_json, authed_client, Backend};
use hostdash_client::types::{AgentStats, AlertFilters, MetricsQuery};
use serde_json::json;

#[tokio::test]
async fn unresolved_alerts_first_page() {
    let backend = Backend::new();
    let results: Vec<_> = (1..=15).map(alert_json).collect();
    backend.reply(
        "GET",
        "/alerts/",
        200,
        json!({"results": results, "count": 15, "next": null, "previous": null}),
    );
    let c = authed_client(&backend.serve().await, "a", "r");

    let filters = AlertFilters {
        resolved: Some(false),
        ..AlertFilters::default()
    };
    let page = c.list_alerts(&filters, 1, 20).await;
    assert_eq!(page.items.len(), 15);
    let p = page.pagination;
    assert_eq!((p.current, p.page_size, p.total, p.total_pages), (1, 20, 15, 1));
    assert!(p.next.is_none() && p.previous.is_none());

    let sent = &backend.requests_to("GET", "/alerts/")[0];
    assert_eq!(sent.query, "resolved=false&page=1&page_size=20");
}

#[tokio::test]
async fn later_page_keeps_links() {
    let backend = Backend::new();
    backend.reply(
        "GET",
        "/alerts/",
        200,
        json!({
            "results": [alert_json(21)],
            "count": 41,
            "next": "http://x/api/alerts/?page=3",
            "previous": "http://x/api/alerts/?page=1",
        }),
    );
    let c = authed_client(&backend.serve().await, "a", "r");
    let page = c.list_alerts(&AlertFilters::default(), 2, 20).await;
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.current, 2);
    assert!(page.pagination.next.is_some());
}

#[tokio::test]
async fn agent_list_accepts_every_shape() {
    let backend = Backend::new();
    backend
        .reply_once("GET", "/agents/", 200, json!([agent_json(1, true), agent_json(2, true)]))
        .reply_once("GET", "/agents/", 200, json!({"results": [agent_json(3, false)]}))
        .reply_once("GET", "/agents/", 200, agent_json(4, true))
        .reply("GET", "/agents/", 200, json!({"detail": "weird"}));
    let c = authed_client(&backend.serve().await, "a", "r");

    assert_eq!(c.list_agents().await.len(), 2);
    assert_eq!(c.list_agents().await[0].id, 3);
    assert_eq!(c.list_agents().await[0].id, 4);
    // an object that is not an agent is dropped, not an error
    assert!(c.list_agents().await.is_empty());
}

#[tokio::test]
async fn reads_degrade_on_server_errors() {
    let backend = Backend::new();
    for path in [
        "/agents/",
        "/agents/stats/",
        "/alerts/",
        "/metrics/",
        "/registrations/pending/",
        "/thresholds/",
        "/notifications/",
    ] {
        backend.reply("GET", path, 500, json!({"error": "boom"}));
    }
    let c = authed_client(&backend.serve().await, "a", "r");

    assert!(c.list_agents().await.is_empty());
    assert_eq!(c.agent_stats().await, AgentStats::default());
    let page = c.list_alerts(&AlertFilters::default(), 1, 20).await;
    assert!(page.items.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert!(c.metrics(&MetricsQuery::default()).await.is_empty());
    assert!(c.pending_registrations().await.is_empty());
    assert!(c.thresholds().await.is_empty());
    assert!(c.notification_channels().await.is_empty());

    // the fallible variants still report the failure
    assert!(c.try_list_agents().await.is_err());
}

#[tokio::test]
async fn stats_error_body_reads_as_zeros() {
    let backend = Backend::new();
    backend.reply(
        "GET",
        "/agents/stats/",
        200,
        json!({"error": "db unavailable", "total_agents": "n/a"}),
    );
    let c = authed_client(&backend.serve().await, "a", "r");
    assert_eq!(c.try_agent_stats().await.unwrap(), AgentStats::default());
}

#[tokio::test]
async fn metrics_query_omits_missing_hours() {
    let backend = Backend::new();
    backend.reply(
        "GET",
        "/metrics/",
        200,
        json!([
            {"timestamp": "2024-05-01T10:00:00Z", "cpu_usage": 40.0, "memory_usage": 61.5},
            {"timestamp": "not a time", "cpu_usage": 1.0},
        ]),
    );
    let c = authed_client(&backend.serve().await, "a", "r");

    let samples = c
        .metrics(&MetricsQuery {
            agent_id: Some(7),
            hours: None,
        })
        .await;
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].cpu_usage, Some(40.0));

    c.metrics(&MetricsQuery::for_agent(7, 24)).await;
    let sent = backend.requests_to("GET", "/metrics/");
    assert_eq!(sent[0].query, "agent_id=7");
    assert_eq!(sent[1].query, "agent_id=7&hours=24");
}

#[tokio::test]
async fn processes_zeroed_on_failure() {
    let backend = Backend::new();
    backend
        .reply_once(
            "GET",
            "/processes/list/",
            200,
            json!({
                "hostname": "web-1",
                "timestamp": "2024-05-01T10:00:00Z",
                "total_processes": 212,
                "root_processes": 40,
                "page": 1, "page_size": 50, "total_pages": 5,
                "top_cpu_processes": [
                    {"pid": 1, "name": "systemd", "user": "root", "cpu_percent": 0.3,
                     "memory_percent": 0.1, "is_root": true}
                ],
                "top_memory_processes": [],
                "load_average": [0.5, 0.4, 0.3],
            }),
        )
        .reply("GET", "/processes/list/", 503, json!({}));
    let c = authed_client(&backend.serve().await, "a", "r");

    let ok = c.processes("web-1", 1, 50).await;
    assert_eq!(ok.total_processes, 212);
    assert!(ok.top_cpu_processes[0].is_root);
    assert_eq!(
        backend.requests_to("GET", "/processes/list/")[0].query,
        "hostname=web-1&page=1&page_size=50"
    );

    let degraded = c.processes("web-1", 2, 50).await;
    assert_eq!(degraded.hostname, "web-1");
    assert_eq!(degraded.total_processes, 0);
    assert!(degraded.top_cpu_processes.is_empty());
    assert!(degraded.top_memory_processes.is_empty());
}
