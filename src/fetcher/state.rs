//! Fetcher state
//!
//! Everything a fetcher mutates lives in `FetchState`, behind one lock.
//! Accumulated items are replaced by a new `Arc` on every change, never
//! modified in place, so snapshots handed out earlier stay valid.

use crate::error::{Error, Result};
use crate::types::{ContinuationToken, FetchOptions, LoadingStatus};
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;

/// Items delivered by one `fetch_next` call
#[derive(Debug, Clone)]
pub struct FetchedPage<T> {
    items: Arc<Vec<T>>,
    has_more: bool,
}

impl<T> FetchedPage<T> {
    pub(crate) fn new(items: Vec<T>, has_more: bool) -> Self {
        Self {
            items: Arc::new(items),
            has_more,
        }
    }

    /// The empty page returned once a listing is exhausted
    pub fn exhausted() -> Self {
        Self::new(Vec::new(), false)
    }

    /// Entities of this page, in server order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Whether another page follows
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Number of entities in this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Published view of a fetcher's state
#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    /// Accumulated entities for the current parameters
    pub items: Arc<Vec<T>>,
    /// Whether another page can be fetched
    pub has_more: bool,
    /// Whether the first page was loaded for the current parameters
    pub loaded_once: bool,
    /// Loading status
    pub status: LoadingStatus,
    /// Error of the last request, if it failed
    pub error: Option<Error>,
    /// Reset counter; bumped on every parameter change
    pub generation: u64,
}

/// Shared handle on the outcome of the in-flight request
pub(crate) type PendingPage<T> = Shared<BoxFuture<'static, Result<FetchedPage<T>>>>;

pub(crate) enum Phase<T> {
    Idle,
    Fetching { pending: PendingPage<T> },
}

/// Which transport call the next fetch issues
pub(crate) enum Request<P> {
    First { params: P, options: FetchOptions },
    Next(ContinuationToken<P>),
}

impl<P> Request<P> {
    pub(crate) fn params(&self) -> &P {
        match self {
            Request::First { params, .. } => params,
            Request::Next(token) => &token.params,
        }
    }

    pub(crate) fn is_first(&self) -> bool {
        matches!(self, Request::First { .. })
    }
}

pub(crate) struct FetchState<T, P> {
    pub params: P,
    pub options: FetchOptions,
    pub generation: u64,
    pub loaded_once: bool,
    pub continuation: Option<ContinuationToken<P>>,
    pub items: Arc<Vec<T>>,
    pub status: LoadingStatus,
    pub error: Option<Error>,
    pub phase: Phase<T>,
    pub disposed: bool,
}

impl<T: Clone, P: Clone> FetchState<T, P> {
    pub fn new(params: P, options: FetchOptions) -> Self {
        Self {
            params,
            options,
            generation: 0,
            loaded_once: false,
            continuation: None,
            items: Arc::new(Vec::new()),
            status: LoadingStatus::Loading,
            error: None,
            phase: Phase::Idle,
            disposed: false,
        }
    }

    pub fn has_more(&self) -> bool {
        !self.loaded_once || self.continuation.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.phase, Phase::Fetching { .. })
    }

    pub fn next_request(&self) -> Request<P> {
        match &self.continuation {
            Some(token) => Request::Next(token.clone()),
            None => Request::First {
                params: self.params.clone(),
                options: self.options.clone(),
            },
        }
    }

    /// Forget everything loaded for the previous parameters
    ///
    /// Bumping the generation orphans the in-flight request: its result is
    /// dropped when it arrives.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.loaded_once = false;
        self.continuation = None;
        self.items = Arc::new(Vec::new());
        self.status = LoadingStatus::Loading;
        self.error = None;
        self.phase = Phase::Idle;
    }

    pub fn apply_page(
        &mut self,
        page: Vec<T>,
        continuation: Option<ContinuationToken<P>>,
    ) -> FetchedPage<T> {
        let mut items = Vec::with_capacity(self.items.len() + page.len());
        items.extend(self.items.iter().cloned());
        items.extend(page.iter().cloned());

        self.items = Arc::new(items);
        self.loaded_once = true;
        self.continuation = continuation;
        self.status = LoadingStatus::Ready;
        self.error = None;
        self.phase = Phase::Idle;
        FetchedPage::new(page, self.continuation.is_some())
    }

    pub fn apply_error(&mut self, error: Error) {
        self.status = LoadingStatus::Error;
        self.error = Some(error);
        self.phase = Phase::Idle;
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        ListSnapshot {
            items: Arc::clone(&self.items),
            has_more: self.has_more(),
            loaded_once: self.loaded_once,
            status: self.status,
            error: self.error.clone(),
            generation: self.generation,
        }
    }
}
