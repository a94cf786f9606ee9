//! The production deduplicating fetch middleware.
//!
//! It consists of three cooperating parts:
//! - Key derivation, computing a [DedupeKey] from a request descriptor.
//! - The in-flight registry, a map from key to the record of the one
//!   outstanding downstream call for that key, plus the waiters
//!   attached to it.
//! - The body multiplexer, which replaces a settled response body with
//!   a replayable capture when more than one waiter has to read it.
//!
//! ### Registry lifecycle
//!
//! - The first caller for a key creates the record, attaches as its
//!   first waiter, and dispatches the single downstream call with a
//!   canonical request carrying a registry-owned abort signal.
//! - Further callers for the same key attach as waiters without any
//!   downstream call.
//! - When the downstream call settles, the record is removed *before*
//!   fan-out, so a call arriving for the same key from that point on
//!   starts a fresh record.
//! - A waiter whose own abort signal fires detaches alone. When the
//!   last waiter detaches mid-flight the record is torn down on the
//!   spot and the registry-owned signal is triggered, cancelling the
//!   shared downstream call.
//! - Records carry an identity, so a call that outlives its record
//!   settles as a no-op and never touches a successor record created
//!   under the same key in the meantime.
//!
//! Lookup, record creation and waiter attachment happen under a single
//! lock acquisition, and the lock is never held across an await.

use fetch_dedupe_api::*;
use http::Method;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

mod key;
pub use key::DedupeKey;

mod share;

#[derive(Debug)]
struct Waiter {
    id: u64,
    send: oneshot::Sender<DedupeResult<FetchResponse>>,
}

#[derive(Debug)]
struct InFlight {
    /// Record identity: the id of the founding waiter. Settlement and
    /// teardown only act on the record they were dispatched for, so a
    /// successor record under the same key is never confused with a
    /// torn-down predecessor whose call is still outstanding.
    id: u64,
    /// Controls the abort signal embedded in the canonical request.
    controller: AbortController,
    waiters: Vec<Waiter>,
}

type State = HashMap<DedupeKey, InFlight>;

/// A production-ready deduplicating fetch middleware.
///
/// Construct one instance per pipeline and pass every eligible request
/// through [Dedupe::dedupe]. Requests with methods outside
/// GET / HEAD / OPTIONS bypass deduplication entirely and are forwarded
/// verbatim. Must be used from within a tokio runtime.
#[derive(Debug, Default)]
pub struct CoreDedupe {
    state: Arc<Mutex<State>>,
    next_waiter_id: AtomicU64,
}

impl CoreDedupe {
    /// Construct a new CoreDedupe instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a new CoreDedupe instance as a [DynDedupe].
    pub fn create() -> DynDedupe {
        let out: DynDedupe = Arc::new(Self::new());
        out
    }

    /// Drive the single downstream call for a record to settlement and
    /// fan the result out to every waiter still attached.
    async fn settle(
        state: Arc<Mutex<State>>,
        key: DedupeKey,
        record_id: u64,
        upstream: BoxFut<'static, DedupeResult<FetchResponse>>,
    ) {
        let settled = upstream.await;

        // Remove the record before fan-out, so a late arrival for this
        // key starts a fresh record rather than observing a settled one.
        // Only the record this call was dispatched for is removed: after
        // a reset or a full detach the key may already hold a successor
        // record with its own call in flight.
        let record = {
            let mut state = state.lock().unwrap();
            match state.entry(key.clone()) {
                Entry::Occupied(e) if e.get().id == record_id => {
                    Some(e.remove())
                }
                _ => None,
            }
        };
        let Some(record) = record else {
            // Every waiter detached before settlement.
            tracing::debug!(key = %key, "call settled after record teardown");
            return;
        };

        let waiters = record.waiters;
        let settled = match settled {
            // A body can be drained only once; with several waiters the
            // response is replaced by a replayable capture, paid for
            // once here.
            Ok(response) if waiters.len() > 1 => {
                share::share(response).await
            }
            settled => settled,
        };

        for waiter in waiters {
            if waiter.send.send(settled.clone()).is_err() {
                tracing::warn!(
                    key = %key,
                    waiter = waiter.id,
                    "waiter went away before fan-out"
                );
            }
        }
    }
}

impl Dedupe for CoreDedupe {
    fn dedupe(
        &self,
        request: FetchRequest,
        next: DynNextStage,
    ) -> BoxFut<'static, DedupeResult<FetchResponse>> {
        // Fail fast, before any registry interaction.
        if let Err(err) = Url::from_str(request.url()) {
            return Box::pin(async move { Err(err) });
        }

        // Only read-safe methods are eligible for sharing.
        if !is_eligible(request.method()) {
            return next.call(request);
        }

        let key = DedupeKey::derive(&request);
        let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let (send, recv) = oneshot::channel();
        let waiter = Waiter { id, send };

        // Either join the existing record for this key, or create one.
        // Both paths attach the waiter within the same lock acquisition
        // as the lookup.
        let canonical = {
            let mut state = self.state.lock().unwrap();
            match state.entry(key.clone()) {
                Entry::Occupied(mut e) => {
                    e.get_mut().waiters.push(waiter);
                    None
                }
                Entry::Vacant(e) => {
                    let controller = AbortController::new();
                    let canonical = request.for_upstream(controller.signal());
                    e.insert(InFlight {
                        id,
                        controller,
                        waiters: vec![waiter],
                    });
                    Some(canonical)
                }
            }
        };

        if let Some(canonical) = canonical {
            tokio::task::spawn(Self::settle(
                self.state.clone(),
                key.clone(),
                id,
                next.call(canonical),
            ));
        }

        let signal = request.signal().cloned();
        // The guard is constructed before the future so that dropping
        // the future, even un-polled, detaches the waiter rather than
        // leaving a dead entry on the record. It tears the record down
        // if no waiter remains.
        let guard = DetachGuard {
            state: self.state.clone(),
            key,
            id,
            armed: true,
        };
        Box::pin(async move {
            let mut recv = recv;
            let settled = match signal {
                None => recv.await.ok(),
                Some(signal) => tokio::select! {
                    settled = &mut recv => settled.ok(),
                    _ = signal.aborted() => {
                        // Detach this waiter alone; the guard triggers
                        // the shared abort if it was the last one.
                        drop(guard);
                        return Err(DedupeError::Aborted);
                    }
                },
            };

            guard.disarm();
            // A closed channel means the registry was reset and this
            // waiter abandoned.
            settled.unwrap_or(Err(DedupeError::Aborted))
        })
    }

    fn reset(&self) {
        // Dropping the records drops their result senders, failing any
        // outstanding waiters. The controllers are dropped untriggered:
        // already-dispatched downstream calls run on and settle against
        // a registry that no longer knows them.
        self.state.lock().unwrap().clear();
    }
}

fn is_eligible(method: &Method) -> bool {
    *method == Method::GET
        || *method == Method::HEAD
        || *method == Method::OPTIONS
}

/// Detach a waiter from its record. Removing the last waiter tears the
/// record down and triggers the registry-owned abort signal, since no
/// caller remains interested in the outcome.
fn detach(state: &Mutex<State>, key: &DedupeKey, id: u64) {
    let controller = {
        let mut state = state.lock().unwrap();
        let Some(record) = state.get_mut(key) else {
            return;
        };
        record.waiters.retain(|w| w.id != id);
        if !record.waiters.is_empty() {
            return;
        }
        state.remove(key).map(|record| record.controller)
    };

    if let Some(controller) = controller {
        controller.abort();
    }
}

struct DetachGuard {
    state: Arc<Mutex<State>>,
    key: DedupeKey,
    id: u64,
    armed: bool,
}

impl DetachGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        if self.armed {
            detach(&self.state, &self.key, self.id);
        }
    }
}
