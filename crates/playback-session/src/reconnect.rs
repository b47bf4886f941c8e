use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// After this many consecutive transport failures, no further retry fires
/// (spec.md §4.4: "after the third failure, remain in `error` and do not
/// retry").
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Retry delay for the Nth attempt (1-indexed): `attempts × 2` seconds — 2,
/// 4, 6 (spec.md §4.4, §8 property 6).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(attempt as u64 * 2)
}

/// A cancellable reconnect timer: a `tokio::time::sleep`-based task, not a
/// polling loop (spec.md §5: "The reconnect delay is a timer, not a sleep
/// loop"). Dropping or cancelling it before it fires is a no-op for the
/// receiver — `stop()` cancels any pending retry (spec.md §4.4).
pub struct ReconnectTimer {
    handle: JoinHandle<()>,
}

impl ReconnectTimer {
    /// Schedule a retry notification on `fired` after the backoff delay for
    /// `attempt`.
    pub fn schedule(attempt: u32, fired: mpsc::Sender<()>) -> Self {
        let delay = backoff_delay(attempt);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(()).await;
        });
        ReconnectTimer { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delays_match_spec() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(1);
        let _timer = ReconnectTimer::schedule(1, tx);

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::channel(1);
        let timer = ReconnectTimer::schedule(1, tx);
        timer.cancel();

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
