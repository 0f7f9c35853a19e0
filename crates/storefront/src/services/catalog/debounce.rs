//! Trailing-edge debouncing for search input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lets only the last of a burst of calls proceed.
///
/// Each [`settle`](Self::settle) call takes a ticket and waits out the
/// window; it wins only if no later call took a ticket meanwhile.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    latest: AtomicU64,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            latest: AtomicU64::new(0),
        }
    }

    /// The quiet window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Wait out the window. Returns true if this call is still the latest.
    pub async fn settle(&self) -> bool {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.window.is_zero() {
            tokio::time::sleep(self.window).await;
        }
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_in_window_wins() {
        let debouncer = Debouncer::new(Duration::from_millis(400));

        let (first, second, third) = tokio::join!(debouncer.settle(), debouncer.settle(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            debouncer.settle().await
        });

        assert!(!first);
        assert!(!second);
        assert!(third);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_both_win() {
        let debouncer = Debouncer::new(Duration::from_millis(400));
        assert!(debouncer.settle().await);
        assert!(debouncer.settle().await);
    }

    #[tokio::test]
    async fn test_zero_window_is_immediate() {
        let debouncer = Debouncer::new(Duration::ZERO);
        assert!(debouncer.settle().await);
    }
}
