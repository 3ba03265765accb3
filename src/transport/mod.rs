//! Transport module
//!
//! The injected I/O boundary of a listing.
//!
//! # Overview
//!
//! A transport knows how to fetch the first page of a listing for some
//! parameters and how to resume it from a continuation token it issued
//! earlier. An entity lookup fetches a single entity by key. The core never
//! implements either for a real backend; see `crate::http` for a REST
//! implementation and `MemoryTransport` for an in-process one.

mod memory;
mod types;

pub use memory::{MemoryLookup, MemoryTransport};
pub use types::{EntityLookup, ListTransport};

#[cfg(test)]
mod tests;
