//! Cancellation primitives for in-flight fetch calls.
//!
//! A structured token pair: the [AbortController] owns the cancellation
//! state, the [AbortSignal] is the clonable view handed to anyone who
//! needs to observe it. Dropping an [AbortSignal::aborted] future is the
//! deterministic way to deregister a listener.

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Owns the cancellation state for one request.
///
/// The registry creates one of these per in-flight record and embeds
/// its signal in the canonical request sent downstream, decoupling the
/// shared call's lifetime from any individual caller's own signal.
#[derive(Debug, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    /// Construct a new AbortController.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Trigger the signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }
}

/// A clonable view onto an [AbortController].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// Returns true if the controller has been triggered.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the controller is triggered. Never resolves if it
    /// is not.
    pub fn aborted(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn happy_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        let waiting = signal.aborted();
        controller.abort();
        waiting.await;

        assert!(signal.is_aborted());
        // listeners registered after the fact resolve immediately
        signal.aborted().await;
    }
}
