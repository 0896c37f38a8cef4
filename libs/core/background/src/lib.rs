//! Background task plumbing
//!
//! Two small building blocks shared by the mail worker and the fulfillment
//! tasks:
//!
//! - **Completion tracking**: [`CompletionTracker`] counts outstanding units of
//!   work. Each unit is represented by a [`TaskGuard`] that deregisters on
//!   drop, so the count is released exactly once on every exit path,
//!   including panics.
//! - **Error fan-in**: [`ErrorReporter`] handles are cloned into every
//!   producer; the single [`ErrorSink`] consumer logs what they report until
//!   its stop signal fires.
//!
//! ```ignore
//! let tracker = CompletionTracker::new();
//! let (reporter, sink) = ErrorSink::channel();
//! let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
//! let sink_task = tokio::spawn(sink.run(stop_rx));
//!
//! let guard = tracker.register();
//! tokio::spawn(async move {
//!     let _guard = guard;
//!     if let Err(e) = do_work().await {
//!         reporter.report("worker", e);
//!     }
//! });
//!
//! tracker.wait_idle().await;
//! let _ = stop_tx.send(());
//! let logged = sink_task.await?;
//! ```

mod sink;
mod tracker;

pub use sink::{BackgroundError, ErrorReporter, ErrorSink};
pub use tracker::{CompletionTracker, TaskGuard};
