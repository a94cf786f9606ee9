//! The dedupe middleware module traits.

use crate::*;
use std::sync::Arc;

/// The next stage of the fetch pipeline: the opaque collaborator that
/// performs the actual transport call.
///
/// Invoked at most once per unique deduplication key per in-flight
/// window, always with the canonical request. Implementations are
/// expected to honor the abort signal embedded in the request they
/// receive by failing their returned future.
pub trait NextStage: 'static + Send + Sync {
    /// Perform the call for the given request.
    fn call(
        &self,
        request: FetchRequest,
    ) -> BoxFut<'static, DedupeResult<FetchResponse>>;
}

/// Trait object [NextStage].
pub type DynNextStage = Arc<dyn NextStage>;

impl<F> NextStage for F
where
    F: Fn(FetchRequest) -> BoxFut<'static, DedupeResult<FetchResponse>>
        + 'static
        + Send
        + Sync,
{
    fn call(
        &self,
        request: FetchRequest,
    ) -> BoxFut<'static, DedupeResult<FetchResponse>> {
        self(request)
    }
}

/// Construct a [DynNextStage] from an async closure.
pub fn next_fn<F, Fut>(f: F) -> DynNextStage
where
    F: Fn(FetchRequest) -> Fut + 'static + Send + Sync,
    Fut: std::future::Future<Output = DedupeResult<FetchResponse>>
        + 'static
        + Send,
{
    Arc::new(move |request: FetchRequest| {
        let fut = f(request);
        let out: BoxFut<'static, DedupeResult<FetchResponse>> = Box::pin(fut);
        out
    })
}

/// Trait for implementing a deduplicating fetch middleware module.
pub trait Dedupe: 'static + Send + Sync + std::fmt::Debug {
    /// Submit a request. Logically-identical idempotent requests that
    /// are in flight concurrently share a single downstream call; every
    /// caller receives the settled result.
    fn dedupe(
        &self,
        request: FetchRequest,
        next: DynNextStage,
    ) -> BoxFut<'static, DedupeResult<FetchResponse>>;

    /// Clear all in-flight records unconditionally, abandoning (not
    /// cancelling) any outstanding waiters. Intended for test isolation.
    fn reset(&self);
}

/// Trait object [Dedupe].
pub type DynDedupe = Arc<dyn Dedupe>;
