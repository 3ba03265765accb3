//! Client configuration
//!
//! Describes the REST endpoint a listing runs against, loaded from YAML:
//!
//! ```yaml
//! base_url: "https://batch01.westus.batch.example.com"
//! api_version: "2024-07-01"
//! headers:
//!   Accept: application/json
//! variables:
//!   region: westus
//! http:
//!   timeout_seconds: 30
//!   max_retries: 3
//!   retry_backoff: { type: exponential, initial_ms: 100, max_ms: 10000 }
//!   rate_limit: { requests_per_second: 10, burst_size: 10 }
//! listing:
//!   records_path: value
//!   key_field: id
//!   pagination: { type: next_link, path: "odata.nextLink" }
//! ```

use crate::error::{Result, ResultExt};
use crate::http::{HttpClient, HttpClientConfig, ListingConfig, RateLimiterConfig};
use crate::types::{BackoffType, JsonValue, StringMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Endpoint configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for every request
    pub base_url: String,

    /// Value of the `api-version` query parameter, if the service wants one
    #[serde(default)]
    pub api_version: Option<String>,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// Variables available to path templates as `{{ vars.* }}`
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Listing response shape
    #[serde(default)]
    pub listing: ListingConfig,
}

impl ClientConfig {
    /// Create a config for `base_url` with defaults everywhere else
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: None,
            headers: StringMap::new(),
            variables: BTreeMap::new(),
            http: HttpConfig::default(),
            listing: ListingConfig::default(),
        }
    }

    /// Parse a config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&yaml)
    }

    /// Template variables as a JSON object
    pub fn vars(&self) -> JsonValue {
        JsonValue::Object(
            self.variables
                .iter()
                .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
                .collect(),
        )
    }

    /// HTTP client settings, with an optional bearer token
    pub fn http_client_config(&self, token: Option<&str>) -> HttpClientConfig {
        let backoff = &self.http.retry_backoff;
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                backoff.backoff_type,
                Duration::from_millis(backoff.initial_ms),
                Duration::from_millis(backoff.max_ms),
            );

        builder = match &self.http.rate_limit {
            Some(limit) => builder.rate_limit(limit.clone()),
            None => builder.no_rate_limit(),
        };
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(token) = token {
            builder = builder.bearer_token(token);
        }
        builder.build()
    }

    /// Build the HTTP client for this endpoint
    pub fn build_client(&self, token: Option<&str>) -> Result<HttpClient> {
        HttpClient::with_config(self.http_client_config(token))
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting; `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: default_rate_limit(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}
