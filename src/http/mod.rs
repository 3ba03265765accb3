//! HTTP transport module
//!
//! Provides an HTTP client with retry, rate limiting and backoff, and the
//! REST implementations of the listing and lookup traits.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Pagination**: Next links (`nextLink`, `odata.nextLink`) and markers
//! - **Path Templates**: Child listings addressed through their parameters

mod client;
mod list;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use list::{ListingConfig, PaginationStyle, QueryParamNames, RestEntityLookup, RestListTransport};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
