//! Cancellable one-shot timers for the display loop.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for a scheduled callback.
///
/// Dropping the token does not cancel the callback; call [`cancel`]
/// explicitly. Cancelling a token whose callback already ran (or was
/// already cancelled) is a no-op.
///
/// [`cancel`]: TimerToken::cancel
#[derive(Debug)]
pub struct TimerToken {
    handle: JoinHandle<()>,
}

impl TimerToken {
    /// Cancel the pending callback. Idempotent.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once the callback has run to completion or been cancelled.
    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run `f` after `delay_ms` milliseconds on the tokio runtime.
pub fn after<F, Fut>(delay_ms: u64, f: F) -> TimerToken
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        f().await;
    });
    TimerToken { handle }
}
