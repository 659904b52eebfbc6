//! Shared "user is interacting" signal.
//!
//! UI event handlers set and clear it; reveal animators wait on it before
//! every write. Waiters are woken by a notification instead of polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// How a wait on the signal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// The signal was clear; no wait happened.
    NotPaused,
    /// The signal was set and has since cleared.
    Resumed,
    /// The signal stayed set past the configured limit.
    TimedOut,
}

/// Cloneable handle to one shared interaction flag.
#[derive(Debug, Clone)]
pub struct InteractionSignal {
    active: Arc<watch::Sender<bool>>,
}

impl Default for InteractionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Set or clear the flag. Repeated sets are idempotent.
    pub fn set(&self, active: bool) {
        self.active.send_if_modified(|current| {
            let changed = *current != active;
            *current = active;
            changed
        });
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Wait until the flag is clear, or until `limit` elapses.
    ///
    /// Returns immediately without yielding when the flag is already clear.
    pub async fn wait_until_idle(&self, limit: Option<Duration>) -> Pause {
        if !self.is_active() {
            return Pause::NotPaused;
        }

        let mut rx = self.active.subscribe();
        match limit {
            None => {
                // The sender lives in `self`, so the channel cannot close here.
                let _ = rx.wait_for(|active| !*active).await;
                Pause::Resumed
            }
            Some(limit) => {
                match tokio::time::timeout(limit, rx.wait_for(|active| !*active)).await {
                    Ok(_) => Pause::Resumed,
                    Err(_) => Pause::TimedOut,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_signal_does_not_wait() {
        let signal = InteractionSignal::new();
        assert_eq!(signal.wait_until_idle(None).await, Pause::NotPaused);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_cleared() {
        let signal = InteractionSignal::new();
        signal.set(true);
        signal.set(true);
        assert!(signal.is_active());

        let clearer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            clearer.set(false);
        });

        let start = tokio::time::Instant::now();
        assert_eq!(signal.wait_until_idle(None).await, Pause::Resumed);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn limit_bounds_the_wait() {
        let signal = InteractionSignal::new();
        signal.set(true);

        let pause = signal
            .wait_until_idle(Some(Duration::from_secs(2)))
            .await;
        assert_eq!(pause, Pause::TimedOut);
        assert!(signal.is_active());
    }
}
