//! Trailing-edge event debouncing.
//!
//! Network events arrive in bursts (a compose up connects many
//! containers in under a second); reconciling per event would rewrite
//! and reload the proxy once per container. The debouncer collapses a
//! burst into a single firing after the burst goes quiet.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Collapses a trigger burst into one action.
///
/// Every [`trigger`](Self::trigger) opens, or restarts, a quiet
/// window; the action runs only when a window elapses with no further
/// trigger. At most one timer task exists at a time: a superseded
/// window is aborted, a fired one leaves its finished handle in the
/// slot until the next trigger claims it.
pub struct Debouncer {
    wait: Duration,
    action: Arc<dyn Fn() + Send + Sync>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer that runs `action` after `wait` of quiet.
    pub fn new(wait: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            wait,
            action: Arc::new(action),
            timer: Mutex::new(None),
        }
    }

    /// Open or restart the quiet window.
    ///
    /// Aborting a timer that already fired is a no-op, so the
    /// cancel-and-replace here is race-free without further
    /// coordination. Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let wait = self.wait;
        let action = Arc::clone(&self.action);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            action();
        }));
    }

    /// Abort an open window without running the action.
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::advance;

    const WAIT: Duration = Duration::from_secs(10);

    fn counted() -> (Debouncer, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(WAIT, move || {
            let _ = tx.send(());
        });
        (debouncer, rx)
    }

    async fn settle() {
        // Let woken timer tasks run to completion.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    /// Trigger and let the spawned timer register its deadline before
    /// the test advances the paused clock.
    async fn trigger(debouncer: &Debouncer) {
        debouncer.trigger();
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_firing() {
        let (debouncer, mut rx) = counted();

        for _ in 0..5 {
            trigger(&debouncer).await;
            advance(Duration::from_secs(1)).await;
        }
        advance(WAIT).await;
        settle().await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_restarts_the_window() {
        let (debouncer, mut rx) = counted();

        trigger(&debouncer).await;
        advance(Duration::from_secs(9)).await;
        trigger(&debouncer).await;
        advance(Duration::from_secs(9)).await;
        settle().await;
        // 18s elapsed but never 10 quiet ones.
        assert!(rx.try_recv().is_err());

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_debouncer_never_fires() {
        let (_debouncer, mut rx) = counted();
        advance(WAIT * 3).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_burst() {
        let (debouncer, mut rx) = counted();

        trigger(&debouncer).await;
        advance(WAIT).await;
        settle().await;
        assert!(rx.try_recv().is_ok());

        trigger(&debouncer).await;
        advance(WAIT).await;
        settle().await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_open_window() {
        let (debouncer, mut rx) = counted();

        debouncer.trigger();
        debouncer.cancel();
        advance(WAIT * 2).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }
}
