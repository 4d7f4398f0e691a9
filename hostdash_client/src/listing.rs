//! Alert list state: filters, page, selection, sort and the optimistic overlay.
//!
//! The last fetched page is never edited. Successful writes push patches onto
//! an overlay that [`AlertListState::view`] applies on top of it; the next
//! successful fetch throws the overlay away.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::{ApiClient, DEFAULT_ALERT_PAGE_SIZE};
use crate::error::{ApiError, ApiResult};
use crate::types::{Alert, AlertFilters, AlertId, BulkResult, Page, Pagination};

/// Upper bound on rendered page controls, ellipses included.
pub const MAX_PAGE_CONTROLS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Resolve,
    Unresolve,
    Delete,
}

impl BulkAction {
    pub fn verb(self) -> &'static str {
        match self {
            BulkAction::Resolve => "Resolve",
            BulkAction::Unresolve => "Reopen",
            BulkAction::Delete => "Delete",
        }
    }
}

/// A confirmed-or-not bulk request over ids known to be on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPlan {
    pub action: BulkAction,
    pub ids: Vec<AlertId>,
}

impl BulkPlan {
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn prompt(&self) -> String {
        let noun = if self.count() == 1 { "alert" } else { "alerts" };
        format!("{} {} {noun}?", self.action.verb(), self.count())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Triggered,
    Level,
    Hostname,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Triggered => "triggered",
            SortKey::Level => "level",
            SortKey::Hostname => "host",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Triggered => SortKey::Level,
            SortKey::Level => SortKey::Hostname,
            SortKey::Hostname => SortKey::Triggered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            key: SortKey::Triggered,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Patch {
    Resolved(AlertId, DateTime<Utc>),
    Unresolved(AlertId),
    Removed(AlertId),
    Note(AlertId, String),
}

fn apply_overlay(fetched: &[Alert], overlay: &[Patch]) -> Vec<Alert> {
    let mut rows = fetched.to_vec();
    for patch in overlay {
        match patch {
            Patch::Removed(id) => rows.retain(|a| a.id != *id),
            Patch::Resolved(id, at) => rows
                .iter_mut()
                .filter(|a| a.id == *id)
                .for_each(|a| a.mark_resolved(*at)),
            Patch::Unresolved(id) => rows
                .iter_mut()
                .filter(|a| a.id == *id)
                .for_each(Alert::mark_unresolved),
            Patch::Note(id, note) => rows
                .iter_mut()
                .filter(|a| a.id == *id)
                .for_each(|a| a.append_note(note)),
        }
    }
    rows
}

fn compare(a: &Alert, b: &Alert, key: SortKey) -> Ordering {
    match key {
        SortKey::Triggered => a.triggered_at.cmp(&b.triggered_at),
        SortKey::Level => a.level.rank().cmp(&b.level.rank()),
        SortKey::Hostname => {
            let host = |x: &Alert| x.agent_hostname.as_deref().unwrap_or("").to_lowercase();
            host(a).cmp(&host(b))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page controls for `current` of `total_pages`, at most [`MAX_PAGE_CONTROLS`]
/// entries. First and last page always show; the middle collapses.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    if total_pages <= MAX_PAGE_CONTROLS {
        return (1..=total_pages).map(PageItem::Page).collect();
    }
    let current = current.clamp(1, total_pages);
    let mut out = Vec::with_capacity(MAX_PAGE_CONTROLS as usize);
    if current <= 4 {
        out.extend((1..=5).map(PageItem::Page));
        out.push(PageItem::Ellipsis);
        out.push(PageItem::Page(total_pages));
    } else if current >= total_pages - 3 {
        out.push(PageItem::Page(1));
        out.push(PageItem::Ellipsis);
        out.extend((total_pages - 4..=total_pages).map(PageItem::Page));
    } else {
        out.push(PageItem::Page(1));
        out.push(PageItem::Ellipsis);
        out.extend((current - 1..=current + 1).map(PageItem::Page));
        out.push(PageItem::Ellipsis);
        out.push(PageItem::Page(total_pages));
    }
    out
}

#[derive(Debug, Clone)]
pub struct AlertListState {
    filters: AlertFilters,
    page: u32,
    page_size: u32,
    sort: Sort,
    fetched: Page<Alert>,
    overlay: Vec<Patch>,
    selected: BTreeSet<AlertId>,
}

impl Default for AlertListState {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_PAGE_SIZE)
    }
}

impl AlertListState {
    pub fn new(page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            filters: AlertFilters::default(),
            page: 1,
            page_size,
            sort: Sort::default(),
            fetched: Page::empty(page_size),
            overlay: Vec::new(),
            selected: BTreeSet::new(),
        }
    }

    pub fn filters(&self) -> &AlertFilters {
        &self.filters
    }

    /// New filters go back to page 1 and drop the selection.
    pub fn set_filters(&mut self, filters: AlertFilters) {
        if filters != self.filters {
            self.filters = filters;
            self.page = 1;
        }
        self.selected.clear();
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.selected.clear();
    }

    /// Step to an adjacent page if one exists. Returns whether the page moved.
    pub fn step_page(&mut self, forward: bool) -> bool {
        let last = self.pagination().total_pages.max(1);
        let target = if forward {
            (self.page + 1).min(last)
        } else {
            self.page.saturating_sub(1).max(1)
        };
        if target == self.page {
            return false;
        }
        self.set_page(target);
        true
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn set_sort(&mut self, sort: Sort) {
        self.sort = sort;
    }

    /// Install a freshly fetched page; the overlay is stale from here on.
    pub fn apply_fetch(&mut self, page: Page<Alert>) {
        if !self.overlay.is_empty() {
            debug!(patches = self.overlay.len(), "discarding alert overlay");
        }
        self.fetched = page;
        self.overlay.clear();
    }

    /// Fetch the current page. A failed read installs an empty page and
    /// reports why.
    pub async fn reload(&mut self, client: &ApiClient) -> ApiResult<()> {
        match client
            .try_list_alerts(&self.filters, self.page, self.page_size)
            .await
        {
            Ok(page) => {
                self.apply_fetch(page);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "alert list read failed");
                self.apply_fetch(Page::empty(self.page_size));
                Err(e)
            }
        }
    }

    /// Rows as rendered: fetched page, overlay applied, then sorted.
    pub fn view(&self) -> Vec<Alert> {
        let mut rows = apply_overlay(&self.fetched.items, &self.overlay);
        let Sort { key, descending } = self.sort;
        rows.sort_by(|a, b| {
            let ord = compare(a, b, key);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        rows
    }

    /// Fetched pagination less any rows deleted locally since.
    pub fn pagination(&self) -> Pagination {
        let mut p = self.fetched.pagination.clone();
        let removed = self
            .overlay
            .iter()
            .filter(|patch| matches!(patch, Patch::Removed(_)))
            .count();
        if removed > 0 {
            p.remove_rows(removed as u64);
        }
        p
    }

    pub fn page_controls(&self) -> Vec<PageItem> {
        let p = self.pagination();
        page_window(self.page, p.total_pages)
    }

    // ---- selection ----

    pub fn selected(&self) -> &BTreeSet<AlertId> {
        &self.selected
    }

    pub fn is_selected(&self, id: AlertId) -> bool {
        self.selected.contains(&id)
    }

    pub fn toggle(&mut self, id: AlertId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn select_all_visible(&mut self) {
        self.selected = self.visible_ids();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    fn visible_ids(&self) -> BTreeSet<AlertId> {
        apply_overlay(&self.fetched.items, &self.overlay)
            .iter()
            .map(|a| a.id)
            .collect()
    }

    /// Check the selection against the rendered page and build the
    /// confirmation. Nothing is sent from here.
    pub fn plan_bulk(&self, action: BulkAction) -> ApiResult<BulkPlan> {
        if self.selected.is_empty() {
            return Err(ApiError::validation("No alerts selected"));
        }
        let visible = self.visible_ids();
        let ids: Vec<AlertId> = self.selected.intersection(&visible).copied().collect();
        if ids.is_empty() {
            return Err(ApiError::StaleSelection(
                "Selected alerts are no longer on this page".into(),
            ));
        }
        Ok(BulkPlan { action, ids })
    }

    /// Run a plan. Unconfirmed plans send nothing and return `None`.
    pub async fn execute_bulk(
        &mut self,
        client: &ApiClient,
        plan: &BulkPlan,
        confirmed: bool,
    ) -> ApiResult<Option<BulkResult>> {
        if !confirmed {
            return Ok(None);
        }
        let result = match plan.action {
            BulkAction::Resolve => client.bulk_resolve_alerts(&plan.ids).await?,
            BulkAction::Unresolve => client.bulk_unresolve_alerts(&plan.ids).await?,
            BulkAction::Delete => client.bulk_delete_alerts(&plan.ids).await?,
        };
        self.apply_bulk(plan, Utc::now());
        Ok(Some(result))
    }

    fn apply_bulk(&mut self, plan: &BulkPlan, now: DateTime<Utc>) {
        for &id in &plan.ids {
            self.overlay.push(match plan.action {
                BulkAction::Resolve => Patch::Resolved(id, now),
                BulkAction::Unresolve => Patch::Unresolved(id),
                BulkAction::Delete => Patch::Removed(id),
            });
        }
        self.selected.clear();
    }

    // ---- single-row actions ----

    pub async fn resolve(&mut self, client: &ApiClient, id: AlertId) -> ApiResult<()> {
        client.resolve_alert(id).await?;
        self.overlay.push(Patch::Resolved(id, Utc::now()));
        Ok(())
    }

    pub async fn unresolve(&mut self, client: &ApiClient, id: AlertId) -> ApiResult<()> {
        client.unresolve_alert(id).await?;
        self.overlay.push(Patch::Unresolved(id));
        Ok(())
    }

    pub async fn delete(&mut self, client: &ApiClient, id: AlertId) -> ApiResult<()> {
        client.delete_alert(id).await?;
        self.overlay.push(Patch::Removed(id));
        self.selected.remove(&id);
        Ok(())
    }

    pub async fn add_note(&mut self, client: &ApiClient, id: AlertId, note: &str) -> ApiResult<()> {
        client.add_alert_note(id, note).await?;
        self.overlay.push(Patch::Note(id, note.trim().to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert(id: i64, level: &str, host: &str, triggered: &str) -> Alert {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("alert {id}"),
            "level": level,
            "agent_hostname": host,
            "triggered_at": triggered,
        }))
        .unwrap()
    }

    fn loaded(ids: &[i64], total: u64) -> AlertListState {
        let mut state = AlertListState::new(20);
        let items = ids
            .iter()
            .map(|&id| alert(id, "medium", "web", "2024-05-01T10:00:00Z"))
            .collect();
        state.apply_fetch(Page {
            items,
            pagination: Pagination::from_count(1, 20, total, None, None),
        });
        state
    }

    fn pages(items: &[PageItem]) -> String {
        items
            .iter()
            .map(|i| match i {
                PageItem::Page(n) => n.to_string(),
                PageItem::Ellipsis => "..".into(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn page_window_is_bounded() {
        assert!(page_window(1, 0).is_empty());
        assert_eq!(pages(&page_window(2, 5)), "1 2 3 4 5");
        assert_eq!(pages(&page_window(1, 20)), "1 2 3 4 5 .. 20");
        assert_eq!(pages(&page_window(10, 20)), "1 .. 9 10 11 .. 20");
        assert_eq!(pages(&page_window(19, 20)), "1 .. 16 17 18 19 20");
        for total in 0..40 {
            for current in 0..=total + 1 {
                assert!(page_window(current, total).len() <= MAX_PAGE_CONTROLS as usize);
            }
        }
    }

    #[test]
    fn page_window_always_contains_current() {
        for total in 1..30 {
            for current in 1..=total {
                assert!(page_window(current, total).contains(&PageItem::Page(current)));
            }
        }
    }

    #[test]
    fn query_changes_clear_selection() {
        let mut state = loaded(&[1, 2, 3], 3);
        state.toggle(1);
        state.toggle(2);
        state.set_page(2);
        assert!(state.selected().is_empty());

        state.toggle(1);
        state.set_filters(AlertFilters {
            resolved: Some(false),
            ..AlertFilters::default()
        });
        assert!(state.selected().is_empty());
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = loaded(&[1, 2], 2);
        state.toggle(2);
        assert!(state.is_selected(2));
        state.toggle(2);
        assert!(!state.is_selected(2));
        state.select_all_visible();
        assert_eq!(state.selected().len(), 2);
    }

    #[test]
    fn stale_selection_is_refused() {
        let mut state = loaded(&[1, 2, 3], 3);
        state.toggle(2);
        // page content replaced without a query change
        state.apply_fetch(Page {
            items: vec![alert(7, "low", "db", "2024-05-01T10:00:00Z")],
            pagination: Pagination::from_count(1, 20, 1, None, None),
        });
        assert!(matches!(
            state.plan_bulk(BulkAction::Delete),
            Err(ApiError::StaleSelection(_))
        ));

        state.clear_selection();
        assert!(matches!(
            state.plan_bulk(BulkAction::Resolve),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn plan_counts_only_visible_ids() {
        let mut state = loaded(&[1, 2, 3], 3);
        state.toggle(1);
        state.toggle(3);
        state.toggle(99);
        let plan = state.plan_bulk(BulkAction::Resolve).unwrap();
        assert_eq!(plan.ids, vec![1, 3]);
        assert_eq!(plan.prompt(), "Resolve 2 alerts?");
    }

    #[test]
    fn bulk_delete_removes_rows_and_decrements_total() {
        let mut state = loaded(&[1, 2, 3], 21);
        assert_eq!(state.pagination().total_pages, 2);
        let plan = BulkPlan {
            action: BulkAction::Delete,
            ids: vec![1, 3],
        };
        state.apply_bulk(&plan, Utc::now());
        let ids: Vec<_> = state.view().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(state.pagination().total, 19);
        assert_eq!(state.pagination().total_pages, 1);
    }

    #[test]
    fn bulk_resolve_patches_in_place_until_next_fetch() {
        let mut state = loaded(&[1, 2], 2);
        state.toggle(1);
        let plan = state.plan_bulk(BulkAction::Resolve).unwrap();
        state.apply_bulk(&plan, Utc::now());
        assert!(state.selected().is_empty());
        let row = state.view().into_iter().find(|a| a.id == 1).unwrap();
        assert!(row.resolved && row.resolved_at.is_some());

        // authoritative refetch says otherwise; overlay is gone
        state.apply_fetch(Page {
            items: vec![alert(1, "medium", "web", "2024-05-01T10:00:00Z")],
            pagination: Pagination::from_count(1, 20, 1, None, None),
        });
        assert!(!state.view()[0].resolved);
    }

    #[test]
    fn note_patch_appends() {
        let mut state = loaded(&[5], 1);
        state.overlay.push(Patch::Note(5, "checked disk".into()));
        state.overlay.push(Patch::Note(5, "rotated logs".into()));
        assert_eq!(state.view()[0].notes, "checked disk\nrotated logs");
    }

    #[test]
    fn sorts_rendered_page() {
        let mut state = AlertListState::new(20);
        state.apply_fetch(Page {
            items: vec![
                alert(1, "low", "Beta", "2024-05-01T09:00:00Z"),
                alert(2, "critical", "alpha", "2024-05-01T11:00:00Z"),
                alert(3, "medium", "gamma", "2024-05-01T10:00:00Z"),
            ],
            pagination: Pagination::from_count(1, 20, 3, None, None),
        });
        let ids = |s: &AlertListState| s.view().iter().map(|a| a.id).collect::<Vec<_>>();

        assert_eq!(ids(&state), vec![2, 3, 1]);
        state.set_sort(Sort {
            key: SortKey::Level,
            descending: false,
        });
        assert_eq!(ids(&state), vec![1, 3, 2]);
        state.set_sort(Sort {
            key: SortKey::Hostname,
            descending: false,
        });
        assert_eq!(ids(&state), vec![2, 1, 3]);
    }

    #[test]
    fn step_page_stays_in_range() {
        let mut state = loaded(&[1], 45);
        assert!(!state.step_page(false));
        assert!(state.step_page(true));
        assert_eq!(state.page(), 2);
        state.set_page(3);
        assert!(!state.step_page(true));
    }
}
