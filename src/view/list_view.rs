//! List view
//!
//! Wraps a `ListFetcher` and publishes the merged collection: pinned
//! entities first, then the fetched ones, each key once.

use super::merge::{merge_items, MergeInput};
use crate::decode::Entity;
use crate::error::{Error, Result};
use crate::fetcher::{FetchedPage, ListFetcher};
use crate::transport::EntityLookup;
use crate::types::{EntityKey, FetchOptions, JsonValue, LoadingStatus};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

/// Observable list over a paginated listing
///
/// Items are published through a watch channel after every completed fetch
/// and every local change. Fixed keys are surfaced first whatever the
/// current parameters; entities missing from the fetched pages are looked
/// up one by one through the optional `EntityLookup`.
pub struct ListView<T, P, R = JsonValue> {
    inner: Arc<ViewInner<T, P, R>>,
}

/// Decides whether a fetch error is reported; `false` marks it handled
pub type ErrorFilter = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

struct ViewInner<T, P, R> {
    fetcher: ListFetcher<T, P, R>,
    lookup: Option<Arc<dyn EntityLookup<T>>>,
    state: Mutex<ViewState<T>>,
    items_tx: watch::Sender<Arc<Vec<T>>>,
    status_tx: watch::Sender<LoadingStatus>,
    errors_tx: watch::Sender<Option<Error>>,
    error_filter: Mutex<Option<ErrorFilter>>,
    poll: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

struct ViewState<T> {
    fixed_keys: Vec<EntityKey>,
    pinned: HashMap<EntityKey, T>,
    added: Vec<T>,
    removed: HashSet<EntityKey>,
    /// Fetched entities as of the last emission
    fetched: Arc<Vec<T>>,
    /// Fetcher generation `added` and `removed` belong to
    generation: u64,
}

impl<T> ViewState<T> {
    fn new(generation: u64) -> Self {
        Self {
            fixed_keys: Vec::new(),
            pinned: HashMap::new(),
            added: Vec::new(),
            removed: HashSet::new(),
            fetched: Arc::new(Vec::new()),
            generation,
        }
    }

    fn clear_local(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

impl<T, P, R> ListView<T, P, R>
where
    T: Entity,
    P: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create a view without a lookup; fixed keys then only resolve to
    /// fetched entities
    pub fn new(fetcher: ListFetcher<T, P, R>) -> Self {
        Self::build(fetcher, None)
    }

    /// Create a view resolving fixed keys through `lookup`
    pub fn with_lookup(fetcher: ListFetcher<T, P, R>, lookup: Arc<dyn EntityLookup<T>>) -> Self {
        Self::build(fetcher, Some(lookup))
    }

    fn build(fetcher: ListFetcher<T, P, R>, lookup: Option<Arc<dyn EntityLookup<T>>>) -> Self {
        let (items_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (status_tx, _) = watch::channel(fetcher.status());
        let (errors_tx, _) = watch::channel(None);
        let state = ViewState::new(fetcher.snapshot().generation);
        Self {
            inner: Arc::new(ViewInner {
                fetcher,
                lookup,
                state: Mutex::new(state),
                items_tx,
                status_tx,
                errors_tx,
                error_filter: Mutex::new(None),
                poll: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current merged items
    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.inner.items_tx.borrow())
    }

    /// Subscribe to the merged items
    pub fn subscribe_items(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.inner.items_tx.subscribe()
    }

    /// Merged items as a stream, starting with the current value
    pub fn items_stream(&self) -> WatchStream<Arc<Vec<T>>> {
        WatchStream::new(self.subscribe_items())
    }

    /// Subscribe to the loading status
    pub fn subscribe_status(&self) -> watch::Receiver<LoadingStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Subscribe to fetch errors; cleared by the next successful fetch
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<Error>> {
        self.inner.errors_tx.subscribe()
    }

    /// Loading status of the last fetch
    pub fn status(&self) -> LoadingStatus {
        *self.inner.status_tx.borrow()
    }

    /// Whether another page can be fetched
    pub fn has_more(&self) -> bool {
        self.inner.fetcher.has_more()
    }

    /// Current parameters
    pub fn params(&self) -> P {
        self.inner.fetcher.params()
    }

    /// Current options
    pub fn options(&self) -> FetchOptions {
        self.inner.fetcher.options()
    }

    /// Cap on the number of published items
    pub fn max_items(&self) -> Option<usize> {
        self.inner.fetcher.options().max_items
    }

    /// Keys pinned at the top, in order
    pub fn fixed_keys(&self) -> Vec<EntityKey> {
        self.inner.state.lock().fixed_keys.clone()
    }

    /// Whether `dispose` was called
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether a poll task is running
    pub fn is_polling(&self) -> bool {
        self.inner
            .poll
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Fetch the next page and republish
    pub async fn fetch_next(&self) -> Result<FetchedPage<T>> {
        self.ensure_live()?;
        if self.inner.fetcher.has_more() {
            self.set_status(LoadingStatus::Loading);
        }
        let outcome = self.inner.fetcher.fetch_next().await;
        self.finish(outcome).await
    }

    /// Fetch every remaining page
    pub async fn fetch_all(&self) -> Result<Arc<Vec<T>>> {
        self.ensure_live()?;
        while self.inner.fetcher.has_more() {
            self.fetch_next().await?;
        }
        Ok(self.items())
    }

    /// Reload the first page
    ///
    /// Items loaded before stay published until the new page arrives.
    /// Locally added and removed entities are forgotten once a page of the
    /// reloaded listing arrives, whether from this call or a later one.
    pub async fn refresh(&self) -> Result<FetchedPage<T>> {
        self.refresh_with(false).await
    }

    /// Reload the first page, unpublishing the fetched entities first when
    /// `clear` is set
    pub async fn refresh_with(&self, clear: bool) -> Result<FetchedPage<T>> {
        self.ensure_live()?;
        if clear {
            let mut state = self.inner.state.lock();
            state.fetched = Arc::new(Vec::new());
            self.publish(&state);
        }
        self.set_status(LoadingStatus::Loading);
        let outcome = self.inner.fetcher.refresh().await;
        self.finish(outcome).await
    }

    /// Reload every page
    pub async fn refresh_all(&self) -> Result<Arc<Vec<T>>> {
        self.refresh().await?;
        self.fetch_all().await
    }

    /// Replace the parameters
    ///
    /// Fetched entities are dropped immediately; pinned ones stay.
    pub fn set_params(&self, params: P) {
        if self.is_disposed() {
            return;
        }
        self.inner.fetcher.set_params(params);
        self.reset_local();
    }

    /// Replace the options
    pub fn set_options(&self, options: FetchOptions) {
        if self.is_disposed() {
            return;
        }
        self.inner.fetcher.set_options(options);
        self.reset_local();
    }

    /// Overlay `patch` on the current options; see `FetchOptions::merged`
    pub fn patch_options(&self, patch: FetchOptions) {
        self.set_options(self.options().merged(patch));
    }

    /// Filter the errors reported through `subscribe_errors`
    ///
    /// Errors for which `filter` returns `false` are treated as handled:
    /// the view reports `Ready` instead of `Error`. The caller awaiting the
    /// fetch still receives the error.
    pub fn set_error_filter<F>(&self, filter: F)
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        *self.inner.error_filter.lock() = Some(Arc::new(filter));
    }

    // ========================================================================
    // Local changes
    // ========================================================================

    /// Pin `keys` at the top of the list, in order
    ///
    /// Resolves once the keys missing from the fetched pages were looked up.
    pub async fn set_fixed_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<EntityKey>,
    {
        if self.is_disposed() {
            return;
        }
        let mut seen = HashSet::new();
        let keys: Vec<EntityKey> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key| seen.insert(key.clone()))
            .collect();
        {
            let mut state = self.inner.state.lock();
            state.pinned.retain(|key, _| keys.contains(key));
            state.fixed_keys = keys;
            self.publish(&state);
        }
        self.sync().await;
    }

    /// Show a newly created or updated entity
    ///
    /// An entity already listed is replaced in place; a new one is put at
    /// the top, below the fixed keys.
    pub fn add_item(&self, entity: T) {
        if self.is_disposed() {
            return;
        }
        let key = entity.key();
        let mut state = self.inner.state.lock();
        state.removed.remove(&key);
        state.added.retain(|existing| existing.key() != key);
        state.added.insert(0, entity);
        debug!(%key, "Added item to list view");
        self.publish(&state);
    }

    /// Hide a deleted entity until the next reset
    pub fn remove_item(&self, key: &str) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.inner.state.lock();
        state.added.retain(|existing| existing.key() != key);
        state.removed.insert(key.to_string());
        debug!(key, "Removed item from list view");
        self.publish(&state);
    }

    // ========================================================================
    // Polling & Disposal
    // ========================================================================

    /// Refresh every `period` until stopped or disposed
    ///
    /// Each tick reloads the first page, or every page with `fetch_all`.
    /// Replaces a poll started earlier. The task only holds a weak
    /// reference, so dropping the view ends it.
    pub fn start_poll(&self, period: Duration, fetch_all: bool) -> Result<()> {
        self.ensure_live()?;
        if period.is_zero() {
            return Err(Error::config("poll interval must be greater than zero"));
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(poll_loop(weak, period, fetch_all));
        if let Some(previous) = self.inner.poll.lock().replace(handle) {
            previous.abort();
        }
        debug!(?period, fetch_all, "Started list polling");
        Ok(())
    }

    /// Stop polling
    pub fn stop_poll(&self) {
        if let Some(handle) = self.inner.poll.lock().take() {
            handle.abort();
            debug!("Stopped list polling");
        }
    }

    /// Release the view
    ///
    /// Stops polling, disposes the fetcher and forgets every pinned entity.
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_poll();
        self.inner.fetcher.dispose();

        let mut state = self.inner.state.lock();
        let generation = state.generation;
        *state = ViewState::new(generation);
        self.inner.items_tx.send_replace(Arc::new(Vec::new()));
        debug!("List view disposed");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn set_status(&self, status: LoadingStatus) {
        self.inner
            .status_tx
            .send_if_modified(|current| std::mem::replace(current, status) != status);
    }

    fn reset_local(&self) {
        {
            let mut state = self.inner.state.lock();
            state.clear_local();
            state.generation = self.inner.fetcher.snapshot().generation;
            state.fetched = Arc::new(Vec::new());
            self.publish(&state);
        }
        self.inner.errors_tx.send_replace(None);
        self.set_status(LoadingStatus::Loading);
    }

    async fn finish<O>(&self, outcome: Result<O>) -> Result<O> {
        match &outcome {
            Ok(_) => {
                self.inner
                    .errors_tx
                    .send_if_modified(|current| current.take().is_some());
                self.sync().await;
            }
            Err(Error::Superseded | Error::Disposed) => {}
            Err(e) => {
                let filter = self.inner.error_filter.lock().clone();
                if filter.is_some_and(|filter| !filter(e)) {
                    debug!(error = %e, "List fetch error handled by filter");
                    if !self.is_disposed() {
                        self.set_status(LoadingStatus::Ready);
                    }
                    return outcome;
                }
                warn!(error = %e, "List fetch failed");
                self.inner.errors_tx.send_replace(Some(e.clone()));
            }
        }
        if !self.is_disposed() {
            self.set_status(self.inner.fetcher.status());
        }
        outcome
    }

    /// Entities the fetcher currently holds, or the last published ones
    /// while a reload is in flight
    fn current_fetched(&self, state: &ViewState<T>) -> Arc<Vec<T>> {
        let snapshot = self.inner.fetcher.snapshot();
        if snapshot.loaded_once {
            snapshot.items
        } else {
            Arc::clone(&state.fetched)
        }
    }

    /// Resolve fixed keys and republish
    async fn sync(&self) {
        let missing: Vec<EntityKey> = {
            let state = self.inner.state.lock();
            let fetched = self.current_fetched(&state);
            let present: HashSet<EntityKey> = fetched.iter().map(Entity::key).collect();
            state
                .fixed_keys
                .iter()
                .filter(|key| !present.contains(*key) && !state.removed.contains(*key))
                .cloned()
                .collect()
        };

        let lookups = match &self.inner.lookup {
            Some(lookup) if !missing.is_empty() => {
                debug!(count = missing.len(), "Looking up fixed keys");
                join_all(missing.into_iter().map(|key| async move {
                    let result = lookup.get(&key).await;
                    (key, result)
                }))
                .await
            }
            _ => Vec::new(),
        };

        if self.is_disposed() {
            return;
        }
        let mut state = self.inner.state.lock();
        let snapshot = self.inner.fetcher.snapshot();
        if snapshot.loaded_once && snapshot.generation != state.generation {
            debug!(
                generation = snapshot.generation,
                "Listing reloaded, dropping local changes"
            );
            state.clear_local();
            state.generation = snapshot.generation;
        }
        let fetched = self.current_fetched(&state);

        for entity in fetched.iter() {
            let key = entity.key();
            if state.fixed_keys.contains(&key) {
                state.pinned.insert(key, entity.clone());
            }
        }
        for (key, result) in lookups {
            if !state.fixed_keys.contains(&key) {
                continue;
            }
            match result {
                Ok(entity) if entity.key() != key => {
                    warn!(
                        %key,
                        returned = %entity.key(),
                        "Lookup returned another entity, keeping previous copy"
                    );
                }
                Ok(entity) => {
                    state.pinned.insert(key, entity);
                }
                Err(e) if e.is_not_found() => {
                    debug!(%key, "Fixed key no longer exists");
                    state.pinned.remove(&key);
                }
                Err(e) => {
                    warn!(%key, error = %e, "Fixed key lookup failed, keeping previous copy");
                }
            }
        }

        state.fetched = fetched;
        self.publish(&state);
    }

    fn publish(&self, state: &ViewState<T>) {
        let items = merge_items(
            &MergeInput {
                fixed_keys: &state.fixed_keys,
                pinned: &state.pinned,
                added: &state.added,
                removed: &state.removed,
                max_items: self.max_items(),
            },
            &state.fetched,
        );
        self.inner.items_tx.send_replace(Arc::new(items));
    }
}

async fn poll_loop<T, P, R>(weak: Weak<ViewInner<T, P, R>>, period: Duration, fetch_all: bool)
where
    T: Entity,
    P: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        let view = ListView { inner };
        if view.is_disposed() {
            break;
        }
        let outcome = if fetch_all {
            view.refresh_all().await.map(drop)
        } else {
            view.refresh().await.map(drop)
        };
        if let Err(e) = outcome {
            debug!(error = %e, "Poll refresh failed");
        }
    }
}

impl<T, P, R> Drop for ViewInner<T, P, R> {
    fn drop(&mut self) {
        if let Some(handle) = self.poll.get_mut().take() {
            handle.abort();
        }
    }
}

impl<T, P, R> std::fmt::Debug for ListView<T, P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ListView")
            .field("items", &self.inner.items_tx.borrow().len())
            .field("fixed_keys", &state.fixed_keys)
            .field("added", &state.added.len())
            .field("removed", &state.removed.len())
            .field("disposed", &self.inner.disposed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
