//! Shared helpers for unit tests

use crate::decode::{Entity, Record};
use crate::error::Result;
use crate::transport::{ListTransport, MemoryTransport};
use crate::types::{ContinuationToken, FetchOptions, JsonValue, Page};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub fn raw(id: &str) -> JsonValue {
    json!({ "id": id, "name": format!("Fake{id}") })
}

pub fn raws(ids: &[&str]) -> Vec<JsonValue> {
    ids.iter().map(|id| raw(id)).collect()
}

pub fn record(id: &str) -> Record {
    Record::new(id, raw(id))
}

pub fn keys<T: Entity>(items: &[T]) -> Vec<String> {
    items.iter().map(Entity::key).collect()
}

/// Memory transport whose calls block until the gate is opened
pub struct GatedTransport {
    inner: MemoryTransport<JsonValue>,
    gate: Semaphore,
    started: AtomicUsize,
}

impl GatedTransport {
    pub fn new(pages: Vec<Vec<JsonValue>>) -> Self {
        Self::wrap(MemoryTransport::new(pages))
    }

    pub fn wrap(inner: MemoryTransport<JsonValue>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        }
    }

    /// Let every pending and future call through
    pub fn open(&self) {
        self.gate.add_permits(1_000);
    }

    /// Let `calls` more calls through
    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Calls that reached the transport, finished or not
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryTransport<JsonValue> {
        &self.inner
    }

    async fn pass(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl<P> ListTransport<P, JsonValue> for GatedTransport
where
    P: Clone + Send + Sync + 'static,
{
    async fn list(&self, params: &P, options: &FetchOptions) -> Result<Page<JsonValue, P>> {
        self.pass().await;
        self.inner.list(params, options).await
    }

    async fn list_next(&self, token: &ContinuationToken<P>) -> Result<Page<JsonValue, P>> {
        self.pass().await;
        self.inner.list_next(token).await
    }
}

/// Yield until `condition` holds
pub async fn settle(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
