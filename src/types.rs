//! Common types used throughout remote-list
//!
//! This module contains shared type definitions, type aliases,
//! and the value objects exchanged with transports.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// Unique key of an entity within a listing
pub type EntityKey = String;

// ============================================================================
// Fetch Options
// ============================================================================

/// Options forwarded to the transport with every listing
///
/// The core never interprets these; transports map them onto their
/// protocol (for OData style APIs: `$filter`, `$select`, `$top`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Filter expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Fields to select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Page size requested from the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    /// Extra query attributes passed through as-is
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Maximum number of entities a view surfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl FetchOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter expression
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the selected fields
    #[must_use]
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the server page size
    #[must_use]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Add a pass-through attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Cap the number of entities a view surfaces
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Overlay `patch`: its set fields win, attributes are merged
    #[must_use]
    pub fn merged(mut self, patch: FetchOptions) -> Self {
        self.filter = patch.filter.or(self.filter);
        self.select = patch.select.or(self.select);
        self.max_results = patch.max_results.or(self.max_results);
        self.max_items = patch.max_items.or(self.max_items);
        self.attributes.extend(patch.attributes);
        self
    }
}

// ============================================================================
// Continuation Token
// ============================================================================

/// Opaque cursor issued by a transport to resume a listing
///
/// Carries the parameters and options of the listing that produced it so
/// transports that must reissue the original query (marker based APIs)
/// can do so. A token is only ever handed back to the transport that
/// issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken<P> {
    /// Next link URL or next-page marker
    pub next_link: String,
    /// Parameters of the originating listing
    pub params: P,
    /// Options of the originating listing
    pub options: FetchOptions,
}

impl<P> ContinuationToken<P> {
    /// Create a new continuation token
    pub fn new(next_link: impl Into<String>, params: P, options: FetchOptions) -> Self {
        Self {
            next_link: next_link.into(),
            params,
            options,
        }
    }
}

// ============================================================================
// Page
// ============================================================================

/// One page of raw payloads as returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R, P> {
    items: Vec<R>,
    continuation: Option<ContinuationToken<P>>,
}

impl<R, P> Page<R, P> {
    /// Create a page with an optional continuation
    pub fn new(items: Vec<R>, continuation: Option<ContinuationToken<P>>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    /// Create the final page of a listing
    pub fn last(items: Vec<R>) -> Self {
        Self::new(items, None)
    }

    /// Raw items in server order
    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Continuation token, `None` when the listing is exhausted
    pub fn continuation(&self) -> Option<&ContinuationToken<P>> {
        self.continuation.as_ref()
    }

    /// Whether another page follows
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// Split the page into its items and continuation
    pub fn into_parts(self) -> (Vec<R>, Option<ContinuationToken<P>>) {
        (self.items, self.continuation)
    }
}

// ============================================================================
// Loading Status
// ============================================================================

/// Loading status of a fetcher or view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStatus {
    /// A request is outstanding, or nothing was loaded yet
    #[default]
    Loading,
    /// The last request succeeded
    Ready,
    /// The last request failed
    Error,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_fetch_options_builder() {
        let options = FetchOptions::new()
            .with_filter("state eq 'active'")
            .with_select(["id", "state"])
            .with_max_results(50)
            .with_attribute("api-version", "2024-07-01")
            .with_max_items(10);

        assert_eq!(options.filter.as_deref(), Some("state eq 'active'"));
        assert_eq!(
            options.select,
            Some(vec!["id".to_string(), "state".to_string()])
        );
        assert_eq!(options.max_results, Some(50));
        assert_eq!(
            options.attributes.get("api-version").map(String::as_str),
            Some("2024-07-01")
        );
        assert_eq!(options.max_items, Some(10));
    }

    #[test]
    fn test_fetch_options_merged() {
        let current = FetchOptions::new()
            .with_filter("state eq 'active'")
            .with_max_results(50)
            .with_attribute("api-version", "2024-07-01");
        let patch = FetchOptions::new()
            .with_select(["id"])
            .with_max_results(10)
            .with_attribute("timeout", "30");

        let merged = current.merged(patch);
        assert_eq!(merged.filter.as_deref(), Some("state eq 'active'"));
        assert_eq!(merged.select, Some(vec!["id".to_string()]));
        assert_eq!(merged.max_results, Some(10));
        assert_eq!(merged.attributes.len(), 2);
        assert_eq!(merged.max_items, None);
    }

    #[test]
    fn test_fetch_options_serialization_skips_empty() {
        let value = serde_json::to_value(FetchOptions::new().with_filter("x")).unwrap();
        assert_eq!(value, json!({"filter": "x"}));
    }

    #[test]
    fn test_page_parts() {
        let token = ContinuationToken::new("tok1", (), FetchOptions::default());
        let page = Page::new(vec![1, 2], Some(token.clone()));
        assert!(page.has_more());
        assert_eq!(page.items(), &[1, 2]);
        assert_eq!(page.continuation(), Some(&token));

        let (items, continuation) = page.into_parts();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(continuation, Some(token));

        let last: Page<i32, ()> = Page::last(vec![3]);
        assert!(!last.has_more());
    }

    #[test]
    fn test_continuation_token_roundtrip() {
        let token = ContinuationToken::new(
            "https://example.com/pools?$skiptoken=abc",
            json!({"account": "acc-1"}),
            FetchOptions::new().with_max_results(10),
        );
        let text = serde_json::to_string(&token).unwrap();
        let parsed: ContinuationToken<JsonValue> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_loading_status_default() {
        assert_eq!(LoadingStatus::default(), LoadingStatus::Loading);
    }
}
