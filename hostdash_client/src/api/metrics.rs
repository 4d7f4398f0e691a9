//! Time-series metrics and process snapshots.

use super::{degrade, ApiClient, Call};
use crate::error::ApiResult;
use crate::normalize::list_from_value;
use crate::types::{MetricSample, MetricsQuery, ProcessSnapshot};

pub const DEFAULT_PROCESS_PAGE_SIZE: u32 = 50;

impl ApiClient {
    pub async fn try_metrics(&self, query: &MetricsQuery) -> ApiResult<Vec<MetricSample>> {
        let value = self
            .fetch(Call::get("metrics/").query(query.query_pairs()))
            .await?;
        Ok(list_from_value(value))
    }

    pub async fn metrics(&self, query: &MetricsQuery) -> Vec<MetricSample> {
        degrade("metrics", self.try_metrics(query).await, Vec::new)
    }

    pub async fn try_processes(
        &self,
        hostname: &str,
        page: u32,
        page_size: u32,
    ) -> ApiResult<ProcessSnapshot> {
        let query = vec![
            ("hostname", hostname.to_string()),
            ("page", page.max(1).to_string()),
            ("page_size", page_size.max(1).to_string()),
        ];
        self.fetch_as(Call::get("processes/list/").query(query)).await
    }

    /// Always resolves; a zeroed snapshot when the backend cannot be read.
    pub async fn processes(&self, hostname: &str, page: u32, page_size: u32) -> ProcessSnapshot {
        degrade(
            "processes",
            self.try_processes(hostname, page, page_size).await,
            || ProcessSnapshot::empty(hostname, page_size),
        )
    }
}
