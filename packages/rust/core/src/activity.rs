//! Process-wide "work in progress" indicator.
//!
//! Modeled as a reference count of in-flight tasks rather than a flag, so
//! one task finishing never hides the indicator while another is still
//! running. Presentation surfaces subscribe to count changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

/// Shared activity counter. Cheap to clone; all clones share one count.
#[derive(Debug, Clone)]
pub struct ActivityIndicator {
    count: Arc<watch::Sender<usize>>,
    peak: Arc<AtomicUsize>,
}

impl Default for ActivityIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityIndicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Increment the count. The returned guard lowers it again exactly once.
    pub fn raise(&self) -> ActivityGuard {
        let mut now = 0;
        self.count.send_modify(|count| {
            *count += 1;
            now = *count;
        });
        self.peak.fetch_max(now, Ordering::Relaxed);
        ActivityGuard {
            indicator: self.clone(),
            lowered: false,
        }
    }

    fn lower(&self) {
        self.count
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Number of raised guards still alive.
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Visible iff at least one guard is alive.
    pub fn is_visible(&self) -> bool {
        self.count() > 0
    }

    /// Highest count observed since creation.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Receiver notified on every count change.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

/// RAII handle for one raise. Dropping it lowers the indicator.
#[derive(Debug)]
pub struct ActivityGuard {
    indicator: ActivityIndicator,
    lowered: bool,
}

impl ActivityGuard {
    /// Lower explicitly, ahead of drop.
    pub fn lower(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.lowered {
            self.lowered = true;
            self.indicator.lower();
        }
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.release();
    }
}
