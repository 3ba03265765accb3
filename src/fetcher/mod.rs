//! List fetcher module
//!
//! Page-by-page retrieval with continuation tracking and request
//! coalescing.
//!
//! # Overview
//!
//! `ListFetcher` owns the pagination state of one listing: parameters,
//! options, continuation token and the accumulated entities. It guarantees
//! at most one transport call in flight, applies pages in the order they
//! were requested, never applies a partially decoded page, and drops results
//! that arrive after a parameter change.

mod list_fetcher;
mod state;

pub use list_fetcher::ListFetcher;
pub use state::{FetchedPage, ListSnapshot};
