//! # remote-list
//!
//! Paginated retrieval of remote collections: continuation tokens, request
//! coalescing, stale-result rejection and pinned entities.
//!
//! ## Features
//!
//! - **ListFetcher**: Page-by-page fetching with at most one request in flight
//! - **ListView**: Observable merged list with fixed keys, local additions
//!   and removals, and periodic refresh
//! - **REST Transport**: Next-link and marker pagination over JSON endpoints
//! - **HTTP Client**: Retries with backoff and token bucket rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use remote_list::http::{HttpClient, RestListTransport};
//! use remote_list::{FetchOptions, ListFetcher, ListView, RecordDecoder, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(HttpClient::new()?);
//!     let transport = RestListTransport::<()>::new(client, "https://api.example.com/jobs");
//!
//!     let fetcher = ListFetcher::new(Arc::new(transport), Arc::new(RecordDecoder::default()), ())
//!         .with_options(FetchOptions::new().with_filter("state eq 'active'"));
//!     let view = ListView::new(fetcher);
//!
//!     view.fetch_next().await?;
//!     for job in view.items().iter() {
//!         println!("{}", job.value());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ ListView   fixed keys · add/remove · poll · items watch  │
//! └───────────────────────────┬──────────────────────────────┘
//! ┌───────────────────────────┴──────────────────────────────┐
//! │ ListFetcher  continuation · coalescing · generations     │
//! └──────┬────────────────────┬────────────────────┬─────────┘
//!  ListTransport        EntityDecoder         EntityLookup
//!  (REST / memory)      (serde / record)      (REST / memory)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Entity decoders
pub mod decode;

/// Transport and lookup traits
pub mod transport;

/// Paginated list fetcher
pub mod fetcher;

/// Observable list view
pub mod view;

/// Path template interpolation
pub mod template;

/// HTTP client and REST transport
pub mod http;

/// YAML client configuration
pub mod config;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::ClientConfig;
pub use decode::{Entity, EntityDecoder, FnDecoder, ParamsMergeDecoder, Record, RecordDecoder, SerdeDecoder};
pub use fetcher::{FetchedPage, ListFetcher, ListSnapshot};
pub use transport::{EntityLookup, ListTransport, MemoryLookup, MemoryTransport};
pub use view::{ErrorFilter, ListView};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
