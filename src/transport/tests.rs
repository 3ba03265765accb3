//! Tests for transport module

use super::*;
use crate::decode::Record;
use crate::error::Error;
use crate::types::{ContinuationToken, FetchOptions};
use serde_json::json;

fn record(id: &str) -> Record {
    Record::new(id, json!({ "id": id }))
}

// ============================================================================
// MemoryTransport Tests
// ============================================================================

#[tokio::test]
async fn test_memory_transport_pages() {
    let transport = MemoryTransport::new(vec![vec![1, 2], vec![3]]);

    let first = ListTransport::<(), i32>::list(&transport, &(), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first.items(), &[1, 2]);
    let token = first.continuation().cloned().unwrap();
    assert_eq!(token.next_link, "1");

    let second = transport.list_next(&token).await.unwrap();
    assert_eq!(second.items(), &[3]);
    assert!(!second.has_more());

    assert_eq!(transport.list_calls(), 1);
    assert_eq!(transport.next_calls(), 1);
    assert_eq!(transport.total_calls(), 2);
}

#[tokio::test]
async fn test_memory_transport_token_carries_params() {
    let transport = MemoryTransport::new(vec![vec![1], vec![2]]);
    let options = FetchOptions::new().with_max_results(1);

    let page = transport
        .list(&"job-1".to_string(), &options)
        .await
        .unwrap();
    let token = page.continuation().unwrap();
    assert_eq!(token.params, "job-1");
    assert_eq!(token.options, options);
}

#[tokio::test]
async fn test_memory_transport_filtered() {
    let transport = MemoryTransport::new(vec![vec![1, 2], vec![3]])
        .with_filtered("odd", vec![vec![1, 3]]);

    let page = ListTransport::<(), i32>::list(
        &transport,
        &(),
        &FetchOptions::new().with_filter("odd"),
    )
    .await
    .unwrap();
    assert_eq!(page.items(), &[1, 3]);
    assert!(!page.has_more());

    let page = ListTransport::<(), i32>::list(
        &transport,
        &(),
        &FetchOptions::new().with_filter("unknown"),
    )
    .await
    .unwrap();
    assert_eq!(page.items(), &[1, 2]);
}

#[tokio::test]
async fn test_memory_transport_queued_failure() {
    let transport = MemoryTransport::new(vec![vec![1]]);
    transport.fail_next(Error::http_status(409, "Conflict"));

    let err = ListTransport::<(), i32>::list(&transport, &(), &FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));

    // Failure is consumed
    let page = ListTransport::<(), i32>::list(&transport, &(), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(page.items(), &[1]);
}

#[tokio::test]
async fn test_memory_transport_bad_token() {
    let transport: MemoryTransport<i32> = MemoryTransport::new(vec![vec![1]]);
    let token = ContinuationToken::new("nope", (), FetchOptions::default());
    let err = transport.list_next(&token).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

// ============================================================================
// MemoryLookup Tests
// ============================================================================

#[tokio::test]
async fn test_memory_lookup() {
    let lookup = MemoryLookup::with_entities([record("a"), record("b")]);

    assert_eq!(lookup.get("a").await.unwrap(), record("a"));
    assert_eq!(lookup.get("zzz").await.unwrap_err(), Error::not_found("zzz"));

    lookup.remove("a");
    assert!(lookup.get("a").await.unwrap_err().is_not_found());

    lookup.insert(record("c"));
    assert!(lookup.get("c").await.is_ok());
    assert_eq!(lookup.calls(), 4);
}
