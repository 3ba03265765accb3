//! In-memory transport and lookup
//!
//! Serve fixed pages from memory. Useful for tests and for wiring a view
//! to data that is already local.

use super::types::{EntityLookup, ListTransport};
use crate::decode::Entity;
use crate::error::{Error, Result};
use crate::types::{ContinuationToken, EntityKey, FetchOptions, Page};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport serving pre-split pages
///
/// Continuation tokens are the index of the next page. Listings can be
/// registered per filter expression; the unfiltered pages serve every
/// other filter.
pub struct MemoryTransport<R> {
    pages: Vec<Vec<R>>,
    filtered: HashMap<String, Vec<Vec<R>>>,
    failures: Mutex<Vec<Error>>,
    list_calls: AtomicUsize,
    next_calls: AtomicUsize,
}

impl<R: Clone> MemoryTransport<R> {
    /// Create a transport serving `pages` in order
    pub fn new(pages: Vec<Vec<R>>) -> Self {
        Self {
            pages,
            filtered: HashMap::new(),
            failures: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            next_calls: AtomicUsize::new(0),
        }
    }

    /// Serve `pages` when the options carry `filter`
    #[must_use]
    pub fn with_filtered(mut self, filter: impl Into<String>, pages: Vec<Vec<R>>) -> Self {
        self.filtered.insert(filter.into(), pages);
        self
    }

    /// Fail the next call with `error`
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, error: Error) {
        self.failures.lock().push(error);
    }

    /// Number of `list` calls served
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_next` calls served
    pub fn next_calls(&self) -> usize {
        self.next_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls served
    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.next_calls()
    }

    fn listing(&self, options: &FetchOptions) -> &[Vec<R>] {
        options
            .filter
            .as_ref()
            .and_then(|filter| self.filtered.get(filter))
            .unwrap_or(&self.pages)
    }

    fn take_failure(&self) -> Option<Error> {
        let mut failures = self.failures.lock();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    }

    fn page<P: Clone>(&self, index: usize, params: &P, options: &FetchOptions) -> Page<R, P> {
        let listing = self.listing(options);
        let items = listing.get(index).cloned().unwrap_or_default();
        let continuation = (index + 1 < listing.len())
            .then(|| ContinuationToken::new((index + 1).to_string(), params.clone(), options.clone()));
        Page::new(items, continuation)
    }
}

impl<R> std::fmt::Debug for MemoryTransport<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("pages", &self.pages.len())
            .field("filtered", &self.filtered.len())
            .field("list_calls", &self.list_calls)
            .field("next_calls", &self.next_calls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<P, R> ListTransport<P, R> for MemoryTransport<R>
where
    P: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    async fn list(&self, params: &P, options: &FetchOptions) -> Result<Page<R, P>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.page(0, params, options))
    }

    async fn list_next(&self, token: &ContinuationToken<P>) -> Result<Page<R, P>> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let index: usize = token
            .next_link
            .parse()
            .map_err(|_| Error::fetch(Some(400), format!("invalid token '{}'", token.next_link)))?;
        Ok(self.page(index, &token.params, &token.options))
    }
}

// ============================================================================
// MemoryLookup
// ============================================================================

/// Entity lookup backed by a map
pub struct MemoryLookup<T> {
    entities: RwLock<HashMap<EntityKey, T>>,
    calls: AtomicUsize,
}

impl<T: Entity> MemoryLookup<T> {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a lookup holding `entities`
    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Self {
        let lookup = Self::new();
        for entity in entities {
            lookup.insert(entity);
        }
        lookup
    }

    /// Insert or replace an entity
    pub fn insert(&self, entity: T) {
        self.entities.write().insert(entity.key(), entity);
    }

    /// Remove an entity
    pub fn remove(&self, key: &str) -> Option<T> {
        self.entities.write().remove(key)
    }

    /// Number of `get` calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T: Entity> Default for MemoryLookup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MemoryLookup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLookup")
            .field("entities", &self.entities.read().len())
            .field("calls", &self.calls)
            .finish()
    }
}

#[async_trait]
impl<T: Entity> EntityLookup<T> for MemoryLookup<T> {
    async fn get(&self, key: &str) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entities
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }
}
