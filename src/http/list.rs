//! REST listing transport
//!
//! Implements `ListTransport` and `EntityLookup` over JSON REST endpoints
//! that return a page of records plus a continuation, either as a next
//! link (`nextLink`, `odata.nextLink`) or as a marker to send back with
//! the original query.

use super::client::{HttpClient, RequestConfig};
use crate::decode::EntityDecoder;
use crate::error::{Error, Result};
use crate::template::{render, TemplateContext};
use crate::transport::{EntityLookup, ListTransport};
use crate::types::{ContinuationToken, FetchOptions, JsonValue, Page};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Fallback property for next links in OData v3 responses
const ODATA_NEXT_LINK: &str = "odata.nextLink";

// ============================================================================
// Listing Configuration
// ============================================================================

/// How a listing response points at the next page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationStyle {
    /// Response carries the URL of the next page
    NextLink {
        /// Property holding the link
        #[serde(default = "default_next_link_path")]
        path: String,
    },
    /// Response carries a marker; the next page repeats the query with it
    Marker {
        /// Query parameter the marker is sent in
        #[serde(default = "default_marker_param")]
        param: String,
        /// Property holding the marker
        #[serde(default = "default_marker_path")]
        path: String,
    },
}

fn default_next_link_path() -> String {
    "nextLink".to_string()
}

fn default_marker_param() -> String {
    "marker".to_string()
}

fn default_marker_path() -> String {
    "nextMarker".to_string()
}

impl Default for PaginationStyle {
    fn default() -> Self {
        Self::NextLink {
            path: default_next_link_path(),
        }
    }
}

/// Query parameter names used for the fetch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParamNames {
    /// Carries `FetchOptions::filter`
    pub filter: String,
    /// Carries `FetchOptions::select`, comma-separated
    pub select: String,
    /// Carries `FetchOptions::max_results`
    pub max_results: String,
}

impl Default for QueryParamNames {
    fn default() -> Self {
        Self {
            filter: "$filter".to_string(),
            select: "$select".to_string(),
            max_results: "$top".to_string(),
        }
    }
}

/// Shape of a listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Dotted path of the records array; empty when the body is the array
    pub records_path: String,
    /// Field uniquely identifying a record
    pub key_field: String,
    /// Continuation style
    pub pagination: PaginationStyle,
    /// Query parameter names
    pub query_names: QueryParamNames,
    /// Page size requested when the options do not set one
    pub page_size: Option<u32>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            records_path: "value".to_string(),
            key_field: "id".to_string(),
            pagination: PaginationStyle::default(),
            query_names: QueryParamNames::default(),
            page_size: None,
        }
    }
}

// ============================================================================
// RestListTransport
// ============================================================================

/// Listing transport over a REST collection
///
/// The path may reference the serialized parameters and the configured
/// variables with `{{ ... }}` templates.
pub struct RestListTransport<P> {
    client: Arc<HttpClient>,
    path: String,
    listing: ListingConfig,
    api_version: Option<String>,
    vars: JsonValue,
    _params: PhantomData<fn(&P)>,
}

impl<P: Serialize> RestListTransport<P> {
    /// Create a transport listing `path`
    pub fn new(client: Arc<HttpClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            listing: ListingConfig::default(),
            api_version: None,
            vars: JsonValue::Null,
            _params: PhantomData,
        }
    }

    /// Set the listing shape
    #[must_use]
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Send `api-version` with every first-page request
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set variables available to the path template
    #[must_use]
    pub fn with_vars(mut self, vars: JsonValue) -> Self {
        self.vars = vars;
        self
    }

    /// Listing shape
    pub fn listing(&self) -> &ListingConfig {
        &self.listing
    }

    fn first_request(&self, params: &P, options: &FetchOptions) -> Result<(String, RequestConfig)> {
        let ctx = TemplateContext::for_params(params)?.with_vars(self.vars.clone());
        let path = render(&self.path, &ctx)?;
        let names = &self.listing.query_names;

        let mut request = RequestConfig::new();
        if let Some(version) = &self.api_version {
            request = request.query("api-version", version);
        }
        if let Some(filter) = &options.filter {
            request = request.query(&names.filter, filter);
        }
        if let Some(select) = &options.select {
            request = request.query(&names.select, select.join(","));
        }
        if let Some(top) = options.max_results.or(self.listing.page_size) {
            request = request.query(&names.max_results, top.to_string());
        }
        for (key, value) in &options.attributes {
            request = request.query(key, value);
        }
        Ok((path, request))
    }

    async fn fetch_page(
        &self,
        url: &str,
        request: RequestConfig,
        params: &P,
        options: &FetchOptions,
    ) -> Result<Page<JsonValue, P>>
    where
        P: Clone,
    {
        let body: JsonValue = self.client.get_json_with_config(url, request).await?;
        let items = take_records(&body, &self.listing.records_path)?;

        let next_link = match &self.listing.pagination {
            PaginationStyle::NextLink { path } => match continuation_value(&body, path)
                .or_else(|| continuation_value(&body, ODATA_NEXT_LINK))
            {
                Some(link) => Some(self.client.build_url(url)?.join(link)?.to_string()),
                None => None,
            },
            PaginationStyle::Marker { path, .. } => {
                continuation_value(&body, path).map(str::to_string)
            }
        };

        debug!(
            url,
            records = items.len(),
            has_more = next_link.is_some(),
            "Fetched listing page"
        );
        let continuation = next_link
            .map(|link| ContinuationToken::new(link, params.clone(), options.clone()));
        Ok(Page::new(items, continuation))
    }
}

#[async_trait]
impl<P> ListTransport<P, JsonValue> for RestListTransport<P>
where
    P: Serialize + Clone + Send + Sync + 'static,
{
    async fn list(&self, params: &P, options: &FetchOptions) -> Result<Page<JsonValue, P>> {
        let (path, request) = self.first_request(params, options)?;
        self.fetch_page(&path, request, params, options).await
    }

    async fn list_next(&self, token: &ContinuationToken<P>) -> Result<Page<JsonValue, P>> {
        match &self.listing.pagination {
            PaginationStyle::NextLink { .. } => {
                self.fetch_page(
                    &token.next_link,
                    RequestConfig::new(),
                    &token.params,
                    &token.options,
                )
                .await
            }
            PaginationStyle::Marker { param, .. } => {
                let (path, request) = self.first_request(&token.params, &token.options)?;
                let request = request.query(param, &token.next_link);
                self.fetch_page(&path, request, &token.params, &token.options)
                    .await
            }
        }
    }
}

impl<P> std::fmt::Debug for RestListTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestListTransport")
            .field("path", &self.path)
            .field("listing", &self.listing)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Look up a property by literal name first, then as a dotted path
fn lookup<'a>(body: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(body);
    }
    body.get(path).or_else(|| {
        path.split('.')
            .try_fold(body, |current, part| current.get(part))
    })
}

fn continuation_value<'a>(body: &'a JsonValue, path: &str) -> Option<&'a str> {
    lookup(body, path)
        .and_then(JsonValue::as_str)
        .filter(|value| !value.is_empty())
}

fn take_records(body: &JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    match lookup(body, path) {
        Some(JsonValue::Array(records)) => Ok(records.clone()),
        Some(JsonValue::Null) | None => Ok(Vec::new()),
        Some(_) => Err(Error::Json {
            message: format!("expected an array at '{path}'"),
        }),
    }
}

// ============================================================================
// RestEntityLookup
// ============================================================================

/// Single entity lookup over a REST item endpoint
///
/// The path template receives the key as `{{ key }}`, percent-encoded as
/// a single path segment. A 404 maps to `Error::NotFound`.
pub struct RestEntityLookup<T> {
    client: Arc<HttpClient>,
    path: String,
    api_version: Option<String>,
    vars: JsonValue,
    decoder: Arc<dyn EntityDecoder<(), JsonValue, T>>,
}

impl<T> RestEntityLookup<T> {
    /// Create a lookup for `path`, decoding with `decoder`
    pub fn new(
        client: Arc<HttpClient>,
        path: impl Into<String>,
        decoder: Arc<dyn EntityDecoder<(), JsonValue, T>>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            api_version: None,
            vars: JsonValue::Null,
            decoder,
        }
    }

    /// Send `api-version` with every request
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set variables available to the path template
    #[must_use]
    pub fn with_vars(mut self, vars: JsonValue) -> Self {
        self.vars = vars;
        self
    }
}

#[async_trait]
impl<T: Send + Sync> EntityLookup<T> for RestEntityLookup<T> {
    async fn get(&self, key: &str) -> Result<T> {
        let ctx = TemplateContext {
            params: json!({ "key": path_segment(key)? }),
            vars: self.vars.clone(),
        };
        let path = render(&self.path, &ctx)?;

        let mut request = RequestConfig::new();
        if let Some(version) = &self.api_version {
            request = request.query("api-version", version);
        }

        let raw: JsonValue = match self.client.get_json_with_config(&path, request).await {
            Ok(raw) => raw,
            Err(e) if e.status() == Some(404) => return Err(Error::not_found(key)),
            Err(e) => return Err(e),
        };
        self.decoder
            .decode(raw, &())
            .map_err(|e| Error::deserialization(0, e.to_string()))
    }
}

/// `key` percent-encoded so it stays one path segment
///
/// Reserved characters (`/`, `?`, `#`, `%`) and spaces are escaped.
fn path_segment(key: &str) -> Result<String> {
    let mut url = Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl {
            message: format!("cannot encode key '{key}'"),
        })?
        .push(key);
    Ok(url.path().trim_start_matches('/').to_string())
}

impl<T> std::fmt::Debug for RestEntityLookup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestEntityLookup")
            .field("path", &self.path)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}
