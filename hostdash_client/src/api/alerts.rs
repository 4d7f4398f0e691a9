//! Alerts: paginated listing plus single and bulk mutations.

use serde_json::json;
use tracing::info;

use super::{degrade, require_text, ApiClient, Call};
use crate::error::{ApiError, ApiResult};
use crate::normalize::page_from_value;
use crate::types::{Alert, AlertFilters, AlertId, BulkResult, Page};

pub const DEFAULT_ALERT_PAGE_SIZE: u32 = 20;

impl ApiClient {
    pub async fn try_list_alerts(
        &self,
        filters: &AlertFilters,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Alert>> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let mut query = filters.query_pairs();
        query.push(("page", page.to_string()));
        query.push(("page_size", page_size.to_string()));
        let value = self.fetch(Call::get("alerts/").query(query)).await?;
        Ok(page_from_value(value, page, page_size))
    }

    /// Always resolves; an empty page when the backend cannot be read.
    pub async fn list_alerts(&self, filters: &AlertFilters, page: u32, page_size: u32) -> Page<Alert> {
        degrade(
            "alerts",
            self.try_list_alerts(filters, page, page_size).await,
            || Page::empty(page_size),
        )
    }

    pub async fn resolve_alert(&self, id: AlertId) -> ApiResult<()> {
        self.fetch(Call::post(format!("alerts/{id}/resolve/"))).await?;
        info!(alert = id, "alert resolved");
        Ok(())
    }

    pub async fn unresolve_alert(&self, id: AlertId) -> ApiResult<()> {
        self.fetch(Call::post(format!("alerts/{id}/unresolve/"))).await?;
        info!(alert = id, "alert reopened");
        Ok(())
    }

    pub async fn delete_alert(&self, id: AlertId) -> ApiResult<()> {
        self.fetch(Call::delete(format!("alerts/{id}/"))).await?;
        info!(alert = id, "alert deleted");
        Ok(())
    }

    pub async fn add_alert_note(&self, id: AlertId, note: &str) -> ApiResult<()> {
        let note = require_text(note, "note")?;
        self.fetch(Call::post(format!("alerts/{id}/add_note/")).json(json!({ "note": note })))
            .await?;
        Ok(())
    }

    pub async fn bulk_resolve_alerts(&self, ids: &[AlertId]) -> ApiResult<BulkResult> {
        self.bulk("bulk_resolve", ids).await
    }

    pub async fn bulk_unresolve_alerts(&self, ids: &[AlertId]) -> ApiResult<BulkResult> {
        self.bulk("bulk_unresolve", ids).await
    }

    pub async fn bulk_delete_alerts(&self, ids: &[AlertId]) -> ApiResult<BulkResult> {
        self.bulk("bulk_delete", ids).await
    }

    async fn bulk(&self, action: &str, ids: &[AlertId]) -> ApiResult<BulkResult> {
        if ids.is_empty() {
            return Err(ApiError::validation("No alerts selected"));
        }
        let call = Call::post(format!("alerts/{action}/")).json(json!({ "alert_ids": ids }));
        let value = self.fetch(call).await?;
        info!(action, count = ids.len(), "bulk alert action");
        Ok(serde_json::from_value(value).unwrap_or_default())
    }
}
