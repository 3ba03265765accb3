//! Transport traits

use crate::error::Result;
use crate::types::{ContinuationToken, FetchOptions, Page};
use async_trait::async_trait;

/// Paginated listing transport
///
/// Errors should be reported as `Error::Fetch` carrying the remote status;
/// anything else is normalized into one by the fetcher.
#[async_trait]
pub trait ListTransport<P, R>: Send + Sync {
    /// Fetch the first page for `params` and `options`
    async fn list(&self, params: &P, options: &FetchOptions) -> Result<Page<R, P>>;

    /// Fetch the page following `token`
    async fn list_next(&self, token: &ContinuationToken<P>) -> Result<Page<R, P>>;
}

/// Single entity lookup by key
#[async_trait]
pub trait EntityLookup<T>: Send + Sync {
    /// Fetch one entity, failing with `Error::NotFound` when it no longer exists
    async fn get(&self, key: &str) -> Result<T>;
}
