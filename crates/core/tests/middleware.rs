//! Exercise the middleware end to end through the public trait objects,
//! the way an embedding pipeline would.

use fetch_dedupe_api::*;
use fetch_dedupe_core::CoreDedupe;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;
use tokio::sync::Semaphore;

const URL: &str = "http://localhost:8000/path/to/data";

/// A stand-in transport stage: counts dispatches and answers each url
/// with a body derived from it once the gate opens.
fn transport(calls: Arc<AtomicUsize>, gate: Arc<Semaphore>) -> DynNextStage {
    next_fn(move |request: FetchRequest| {
        calls.fetch_add(1, SeqCst);
        let gate = gate.clone();
        async move {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| DedupeError::upstream("transport shut down"))?;
            Ok(FetchResponse::ok(format!(
                "{{\"url\":\"{}\"}}",
                request.url()
            )))
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_shares_one_transport_call_per_key() {
    let dedupe: DynDedupe = CoreDedupe::create();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let next = transport(calls.clone(), gate.clone());

    let mut pending = Vec::new();
    for _ in 0..4 {
        pending.push(dedupe.dedupe(FetchRequest::get(URL), next.clone()));
    }
    // a write never shares
    pending.push(dedupe.dedupe(FetchRequest::post(URL), next.clone()));
    gate.add_permits(2);

    for fut in pending {
        let res = fut.await.unwrap();
        assert_eq!(URL, res.json().await.unwrap()["url"]);
    }
    assert_eq!(2, calls.load(SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn settled_windows_do_not_bleed_into_each_other() {
    let dedupe: DynDedupe = CoreDedupe::create();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(2));
    let next = transport(calls.clone(), gate.clone());

    let first = dedupe
        .dedupe(FetchRequest::get(URL), next.clone())
        .await
        .unwrap();
    let second = dedupe
        .dedupe(FetchRequest::get(URL), next.clone())
        .await
        .unwrap();

    assert_eq!(2, calls.load(SeqCst));
    // each window had a single waiter, so both bodies stay single-read
    assert!(!first.body().is_shared());
    assert!(!second.body().is_shared());
    assert_eq!(first.text().await.unwrap(), second.text().await.unwrap());
}
