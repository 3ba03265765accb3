//! Paginated list fetcher
//!
//! Drives a transport page by page, decodes each page and accumulates the
//! entities for the current parameters.

use super::state::{FetchState, FetchedPage, ListSnapshot, PendingPage, Phase, Request};
use crate::decode::{decode_page, EntityDecoder};
use crate::error::{Error, Result};
use crate::transport::ListTransport;
use crate::types::{ContinuationToken, FetchOptions, JsonValue, LoadingStatus};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

/// Paginated fetcher over one transport
///
/// At most one transport call is outstanding per fetcher: a `fetch_next`
/// issued while another is in flight joins it and receives the same
/// outcome. Changing the parameters orphans the in-flight call; it still
/// runs to completion in the background but its result is discarded and
/// its awaiters receive `Error::Superseded`.
///
/// Transport calls run on spawned tokio tasks, so a tokio runtime must be
/// current when `fetch_next` is awaited. A call that panics fails with
/// `Error::Other` and leaves the fetcher ready for the next attempt.
pub struct ListFetcher<T, P, R = JsonValue> {
    inner: Arc<FetcherInner<T, P, R>>,
}

struct FetcherInner<T, P, R> {
    transport: Arc<dyn ListTransport<P, R>>,
    decoder: Arc<dyn EntityDecoder<P, R, T>>,
    state: Mutex<FetchState<T, P>>,
    snapshot_tx: watch::Sender<ListSnapshot<T>>,
}

enum Begin<T> {
    Done(FetchedPage<T>),
    Pending(PendingPage<T>),
}

impl<T, P, R> ListFetcher<T, P, R>
where
    T: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create a fetcher for `params` with default options
    pub fn new(
        transport: Arc<dyn ListTransport<P, R>>,
        decoder: Arc<dyn EntityDecoder<P, R, T>>,
        params: P,
    ) -> Self {
        let state = FetchState::new(params, FetchOptions::default());
        let (snapshot_tx, _snapshot_rx) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(FetcherInner {
                transport,
                decoder,
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }

    /// Set the initial options
    #[must_use]
    pub fn with_options(self, options: FetchOptions) -> Self {
        self.set_options(options);
        self
    }

    /// Current parameters
    pub fn params(&self) -> P {
        self.inner.state.lock().params.clone()
    }

    /// Current options
    pub fn options(&self) -> FetchOptions {
        self.inner.state.lock().options.clone()
    }

    /// Whether another page can be fetched
    ///
    /// True until the first page is loaded, then true while the last page
    /// carried a continuation token.
    pub fn has_more(&self) -> bool {
        self.inner.state.lock().has_more()
    }

    /// Whether the first page was loaded for the current parameters
    pub fn is_loaded(&self) -> bool {
        self.inner.state.lock().loaded_once
    }

    /// Whether a transport call is in flight for the current parameters
    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().is_fetching()
    }

    /// Current continuation token
    pub fn continuation(&self) -> Option<ContinuationToken<P>> {
        self.inner.state.lock().continuation.clone()
    }

    /// Accumulated entities
    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.inner.state.lock().items)
    }

    /// Loading status
    pub fn status(&self) -> LoadingStatus {
        self.inner.state.lock().status
    }

    /// Error of the last request, if it failed
    pub fn last_error(&self) -> Option<Error> {
        self.inner.state.lock().error.clone()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.inner.state.lock().snapshot()
    }

    /// Subscribe to snapshots, published after every state change
    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Whether `dispose` was called
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Fetch the next page
    ///
    /// Issues `list` for the first page and `list_next` afterwards. Once the
    /// listing is exhausted this resolves to an empty page without calling
    /// the transport.
    pub async fn fetch_next(&self) -> Result<FetchedPage<T>> {
        match self.begin_fetch()? {
            Begin::Done(page) => Ok(page),
            Begin::Pending(pending) => pending.await,
        }
    }

    /// Fetch pages until the listing is exhausted
    pub async fn fetch_all(&self) -> Result<Arc<Vec<T>>> {
        while self.has_more() {
            self.fetch_next().await?;
        }
        Ok(self.items())
    }

    /// Replace the parameters and forget everything loaded so far
    pub fn set_params(&self, params: P) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        state.params = params;
        state.reset();
        debug!(generation = state.generation, "List parameters changed");
        self.inner.publish(&state);
    }

    /// Replace the options and forget everything loaded so far
    pub fn set_options(&self, options: FetchOptions) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        state.options = options;
        state.reset();
        debug!(generation = state.generation, "List options changed");
        self.inner.publish(&state);
    }

    /// Discard all pages and fetch the first one again
    pub async fn refresh(&self) -> Result<FetchedPage<T>> {
        {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return Err(Error::Disposed);
            }
            state.reset();
            debug!(generation = state.generation, "Refreshing list");
            self.inner.publish(&state);
        }
        self.fetch_next().await
    }

    /// Release the fetcher
    ///
    /// Pending results are discarded and later calls fail with
    /// `Error::Disposed`. Calling it again is a no-op.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.generation += 1;
        state.phase = Phase::Idle;
        debug!("List fetcher disposed");
        self.inner.publish(&state);
    }

    fn begin_fetch(&self) -> Result<Begin<T>> {
        let (generation, request, tx, pending) = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return Err(Error::Disposed);
            }
            if let Phase::Fetching { pending } = &state.phase {
                debug!("Joining in-flight page request");
                return Ok(Begin::Pending(pending.clone()));
            }
            if !state.has_more() {
                return Ok(Begin::Done(FetchedPage::exhausted()));
            }

            let request = state.next_request();
            let generation = state.generation;
            let (tx, rx) = oneshot::channel();
            let pending: PendingPage<T> = rx
                .map(|outcome| {
                    outcome.unwrap_or_else(|_| {
                        Err(Error::Other("page request dropped before completing".to_string()))
                    })
                })
                .boxed()
                .shared();

            state.phase = Phase::Fetching {
                pending: pending.clone(),
            };
            state.status = LoadingStatus::Loading;
            state.error = None;
            self.inner.publish(&state);
            (generation, request, tx, pending)
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(inner.execute(generation, request))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(generation, "Page request panicked");
                    inner.apply(generation, Err(Error::Other("page request panicked".to_string())))
                }
            };
            // Every awaiter may have gone away; the state is updated regardless
            let _ = tx.send(outcome);
        });

        Ok(Begin::Pending(pending))
    }
}

impl<T, P, R> FetcherInner<T, P, R>
where
    T: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    async fn execute(&self, generation: u64, request: Request<P>) -> Result<FetchedPage<T>> {
        debug!(generation, first = request.is_first(), "Requesting page");
        let response = match &request {
            Request::First { params, options } => self.transport.list(params, options).await,
            Request::Next(token) => self.transport.list_next(token).await,
        };

        let decoded = response.map_err(Error::into_fetch_error).and_then(|page| {
            let (raw, continuation) = page.into_parts();
            decode_page(self.decoder.as_ref(), raw, request.params())
                .map(|items| (items, continuation))
        });

        self.apply(generation, decoded)
    }

    fn apply(
        &self,
        generation: u64,
        decoded: Result<(Vec<T>, Option<ContinuationToken<P>>)>,
    ) -> Result<FetchedPage<T>> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(Error::Disposed);
        }
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                "Discarding page for stale parameters"
            );
            return Err(Error::Superseded);
        }

        let outcome = match decoded {
            Ok((items, continuation)) => {
                let page = state.apply_page(items, continuation);
                debug!(
                    received = page.len(),
                    total = state.items.len(),
                    has_more = page.has_more(),
                    "Applied page"
                );
                Ok(page)
            }
            Err(e) => {
                debug!(error = %e, "Page request failed");
                state.apply_error(e.clone());
                Err(e)
            }
        };
        self.publish(&state);
        outcome
    }

    fn publish(&self, state: &FetchState<T, P>) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}

impl<T, P, R> std::fmt::Debug for ListFetcher<T, P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ListFetcher")
            .field("generation", &state.generation)
            .field("loaded_once", &state.loaded_once)
            .field("has_continuation", &state.continuation.is_some())
            .field("items", &state.items.len())
            .field("status", &state.status)
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}
