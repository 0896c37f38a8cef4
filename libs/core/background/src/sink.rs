//! Centralised, single-consumer error reporting for background work.

use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

/// A failure raised by some background task, tagged with where it came from.
#[derive(Debug)]
pub struct BackgroundError {
    origin: &'static str,
    error: eyre::Report,
}

impl BackgroundError {
    pub fn new(origin: &'static str, error: impl Into<eyre::Report>) -> Self {
        Self {
            origin,
            error: error.into(),
        }
    }

    /// Component that reported the failure (`mail`, `invoice`, ...).
    pub fn origin(&self) -> &'static str {
        self.origin
    }

    pub fn error(&self) -> &eyre::Report {
        &self.error
    }
}

impl fmt::Display for BackgroundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:#}", self.origin, self.error)
    }
}

/// Producer side of the error channel.
///
/// Cloned into every task that may fail. Producers cannot close the channel;
/// only the [`ErrorSink`] stops consuming, when told to.
#[derive(Clone, Debug)]
pub struct ErrorReporter {
    tx: mpsc::UnboundedSender<BackgroundError>,
}

impl ErrorReporter {
    /// Report a failure. Never blocks.
    ///
    /// If the sink has already stopped the error is logged here instead, so
    /// nothing reported is ever dropped silently.
    pub fn report(&self, origin: &'static str, error: impl Into<eyre::Report>) {
        if let Err(mpsc::error::SendError(err)) = self.tx.send(BackgroundError::new(origin, error)) {
            error!(origin = err.origin(), "Error sink closed, logging directly: {err}");
        }
    }

    /// True once the sink has stopped and released its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the error channel: logs everything it receives.
#[derive(Debug)]
pub struct ErrorSink {
    rx: mpsc::UnboundedReceiver<BackgroundError>,
    logged: usize,
}

impl ErrorSink {
    /// Create the error channel. Call once per process.
    pub fn channel() -> (ErrorReporter, ErrorSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ErrorReporter { tx }, ErrorSink { rx, logged: 0 })
    }

    /// Receive the next reported error, for callers that want to consume the
    /// channel themselves instead of logging it.
    pub async fn next(&mut self) -> Option<BackgroundError> {
        self.rx.recv().await
    }

    /// Log reported errors until `stop` fires (or its sender is dropped).
    ///
    /// Errors already buffered when the stop signal arrives are still logged
    /// before returning. Returns the total number of errors logged.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> usize {
        info!("Error sink started");

        loop {
            tokio::select! {
                biased;
                Some(err) = self.rx.recv() => self.log(&err),
                _ = &mut stop => break,
            }
        }

        self.rx.close();
        while let Ok(err) = self.rx.try_recv() {
            self.log(&err);
        }

        info!(logged = self.logged, "Error sink stopped");
        self.logged
    }

    fn log(&mut self, err: &BackgroundError) {
        self.logged += 1;
        error!(origin = err.origin(), "Background task failed: {:#}", err.error());
        debug!(logged = self.logged, "Background error recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("smtp unavailable")]
    struct Unavailable;

    #[tokio::test]
    async fn test_reported_errors_reach_the_sink() {
        let (reporter, mut sink) = ErrorSink::channel();
        reporter.report("mail", Unavailable);

        let err = sink.next().await.unwrap();
        assert_eq!(err.origin(), "mail");
        assert!(err.to_string().contains("smtp unavailable"));
    }

    #[tokio::test]
    async fn test_run_counts_every_error_including_buffered_ones() {
        let (reporter, sink) = ErrorSink::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        for _ in 0..5 {
            reporter.report("invoice", eyre::eyre!("failed"));
        }
        // Stop is already signalled when the loop starts; buffered errors
        // must still be logged.
        stop_tx.send(()).unwrap();

        let logged = sink.run(stop_rx).await;
        assert_eq!(logged, 5);
        assert!(reporter.is_closed());
    }

    #[tokio::test]
    async fn test_run_keeps_consuming_until_stopped() {
        let (reporter, sink) = ErrorSink::channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(sink.run(stop_rx));

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let reporter = reporter.clone();
                tokio::spawn(async move { reporter.report("manual", eyre::eyre!("task {i}")) })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        stop_tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_report_after_stop_does_not_panic() {
        let (reporter, sink) = ErrorSink::channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        stop_tx.send(()).unwrap();
        assert_eq!(sink.run(stop_rx).await, 0);

        reporter.report("mail", eyre::eyre!("late"));
        assert!(reporter.is_closed());
    }
}
