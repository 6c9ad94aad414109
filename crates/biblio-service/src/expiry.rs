//! One-shot, cancellable expiry timers for search sessions.
//!
//! Each timer is owned by exactly one session entry. A single atomic claim
//! flag resolves the cancel-vs-fire race: whichever actor flips the flag
//! first owns cleanup, the loser is a no-op. The sleeping task is aborted
//! only after a cancel *wins* the claim, so an in-flight callback is never
//! torn down halfway.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::AbortHandle;
use uuid::Uuid;

/// Handle to an armed timer, stored in the session it protects.
#[derive(Debug)]
pub struct ExpiryHandle {
    claimed: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl ExpiryHandle {
    /// Prevents a not-yet-fired timer from running its callback.
    ///
    /// Returns `true` if this call won the claim (the callback will never
    /// run), `false` if the timer already fired or was already cancelled.
    /// Idempotent.
    pub fn cancel(&self) -> bool {
        let won = self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            // Safe to abort: the task has not claimed, so it is still
            // sleeping (or will observe the claim and exit).
            self.abort.abort();
        }
        won
    }

    /// Whether the claim has been taken by either actor.
    pub fn is_settled(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Arms one-shot delayed cleanup callbacks.
pub struct ExpiryScheduler;

impl ExpiryScheduler {
    /// Spawns a task that waits `delay`, then invokes `callback(session_id)`
    /// unless the handle was cancelled first.
    ///
    /// Exactly one of {callback fires, cancel wins} occurs per timer. The
    /// callback runs on the runtime, outside any caller's stack.
    pub fn schedule<F, Fut>(session_id: Uuid, delay: Duration, callback: F) -> ExpiryHandle
    where
        F: FnOnce(Uuid) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let claimed = Arc::new(AtomicBool::new(false));
        let claim = Arc::clone(&claimed);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let won = claim
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            if won {
                callback(session_id).await;
            }
        });

        ExpiryHandle {
            claimed,
            abort: task.abort_handle(),
        }
    }
}
