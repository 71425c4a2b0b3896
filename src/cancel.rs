/// Shared cancellation signal.
///
/// One token is cloned into every task (monitor, stdin listener, alarm).
/// The flag is set once and never cleared. `sleep_unless_cancelled` is the
/// cancellable wait primitive every task uses instead of a bare sleep, so a
/// cancellation request is observed well within one second no matter how
/// long the configured wait is.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; wakes every pending wait.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if it already was. The waiter is registered
    /// before the flag is re-checked, so a `cancel()` racing this call
    /// cannot be missed.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Sleep for `dur` unless cancellation arrives first.
    ///
    /// Returns `true` when cancellation was requested, whether before the
    /// call or during the wait.
    pub async fn sleep_unless_cancelled(&self, dur: Duration) -> bool {
        tokio::select! {
            _ = self.cancelled() => true,
            _ = tokio::time::sleep(dur) => self.is_cancelled(),
        }
    }
}
