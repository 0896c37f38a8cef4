//! Outstanding-work counter used to gate shutdown.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Counts units of background work that have not finished yet.
///
/// Cloning is cheap and every clone observes the same count. Updates go
/// through [`watch::Sender::send_modify`], so concurrent register and release
/// calls never lose an update, and waiters are woken whenever the count
/// changes.
#[derive(Clone, Debug)]
pub struct CompletionTracker {
    count: Arc<watch::Sender<usize>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Register one pending unit of work.
    ///
    /// The unit stays pending until the returned guard is dropped.
    pub fn register(&self) -> TaskGuard {
        self.count.send_modify(|count| *count += 1);
        trace!(pending = *self.count.borrow(), "Registered background task");
        TaskGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Number of units currently pending.
    pub fn pending(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until no unit is pending.
    ///
    /// Returns immediately when the tracker is already idle. Work registered
    /// after this returns is not waited for.
    pub async fn wait_idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One registered unit of work; releases it when dropped.
#[must_use = "dropping the guard immediately marks the task as complete"]
#[derive(Debug)]
pub struct TaskGuard {
    count: Arc<watch::Sender<usize>>,
}

impl TaskGuard {
    /// Explicitly mark the unit complete.
    pub fn complete(self) {}
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.count.send_modify(|count| {
            // A guard only exists after a matching increment.
            debug_assert!(*count > 0, "completion tracker underflow");
            *count = count.saturating_sub(1);
        });
        trace!(pending = *self.count.borrow(), "Released background task");
    }
}
