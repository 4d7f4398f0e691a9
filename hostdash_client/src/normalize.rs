//! Coerces the backend's assorted response shapes into lists and pages.
//!
//! List endpoints answer with a bare array, a paginated `{results, count, next,
//! previous}` envelope, or occasionally a single object. Callers only ever see
//! `Vec<T>` / `Page<T>`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::types::{Page, Pagination};

/// Decode each element on its own so one malformed row is dropped, not the list.
fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    let total = items.len();
    let out: Vec<T> = items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if out.len() != total {
        warn!(
            dropped = total - out.len(),
            total, "skipped rows that did not match the expected shape"
        );
    }
    out
}

/// Array, `{results: [...]}`, single object or anything else -> `Vec<T>`.
pub fn list_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => decode_items(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => decode_items(items),
            Some(other) => {
                warn!(kind = value_kind(&other), "`results` is not an array");
                Vec::new()
            }
            None => decode_items(vec![Value::Object(map)]),
        },
        Value::Null => Vec::new(),
        other => {
            warn!(kind = value_kind(&other), "unexpected list payload");
            Vec::new()
        }
    }
}

/// Normalize a list response into a page. Envelopes use `count` for totals;
/// bare lists are treated as the complete result set.
pub fn page_from_value<T: DeserializeOwned>(value: Value, page: u32, page_size: u32) -> Page<T> {
    if let Value::Object(mut map) = value {
        if map.contains_key("results") {
            let count = map.get("count").and_then(Value::as_u64);
            let next = take_link(&mut map, "next");
            let previous = take_link(&mut map, "previous");
            let items: Vec<T> = match map.remove("results") {
                Some(Value::Array(items)) => decode_items(items),
                _ => Vec::new(),
            };
            // total can never be smaller than what we are holding
            let total = count.unwrap_or(0).max(items.len() as u64);
            return Page {
                items,
                pagination: Pagination::from_count(page, page_size, total, next, previous),
            };
        }
        let items = list_from_value(Value::Object(map));
        return unpaged(items, page_size);
    }
    unpaged(list_from_value(value), page_size)
}

fn unpaged<T>(items: Vec<T>, page_size: u32) -> Page<T> {
    let size = page_size.max(items.len().try_into().unwrap_or(u32::MAX));
    let total = items.len() as u64;
    Page {
        items,
        pagination: Pagination::from_count(1, size, total, None, None),
    }
}

fn take_link(map: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
