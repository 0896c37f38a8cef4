//! Process-wide shutdown of the fulfillment pipeline.

use background::{CompletionTracker, ErrorReporter};
use email::{MailHandle, WorkerReport, MAIL_ORIGIN};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Outcome of [`LifecycleCoordinator::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// What the mail worker handled over its lifetime
    pub mail: WorkerReport,
    /// Errors the sink logged over its lifetime
    pub errors_logged: usize,
    pub mail_queue_closed: bool,
    pub error_channel_closed: bool,
}

/// Sole owner of the pipeline's stop signals and background loops.
///
/// There is exactly one coordinator per pipeline and [`shutdown`] consumes
/// it, so the channels cannot be closed twice:
///
/// ```compile_fail
/// # use domain_subscriptions::LifecycleCoordinator;
/// async fn close_twice(coordinator: LifecycleCoordinator) {
///     coordinator.shutdown().await;
///     coordinator.shutdown().await;
/// }
/// ```
///
/// [`shutdown`]: LifecycleCoordinator::shutdown
pub struct LifecycleCoordinator {
    tracker: CompletionTracker,
    mail: MailHandle,
    errors: ErrorReporter,
    mail_stop: oneshot::Sender<()>,
    mail_worker: JoinHandle<WorkerReport>,
    sink_stop: oneshot::Sender<()>,
    sink: JoinHandle<usize>,
}

impl LifecycleCoordinator {
    pub(crate) fn new(
        tracker: CompletionTracker,
        mail: MailHandle,
        errors: ErrorReporter,
        mail_stop: oneshot::Sender<()>,
        mail_worker: JoinHandle<WorkerReport>,
        sink_stop: oneshot::Sender<()>,
        sink: JoinHandle<usize>,
    ) -> Self {
        Self {
            tracker,
            mail,
            errors,
            mail_stop,
            mail_worker,
            sink_stop,
            sink,
        }
    }

    /// Units of background work still outstanding.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Drain and stop the pipeline.
    ///
    /// 1. Wait until every tracked task, queued mail included, has finished.
    /// 2. Stop the mail worker and wait for it to exit.
    /// 3. Stop the error sink and wait for it to exit.
    /// 4. Drop the remaining channel handles.
    ///
    /// Nothing is cancelled; a hung task blocks shutdown. Callers that need
    /// a bound should wrap this in a timeout.
    pub async fn shutdown(self) -> ShutdownReport {
        let Self {
            tracker,
            mail,
            errors,
            mail_stop,
            mail_worker,
            sink_stop,
            sink,
        } = self;

        info!(pending = tracker.pending(), "Waiting for background work to finish");
        tracker.wait_idle().await;
        debug!("Background work drained");

        if mail_stop.send(()).is_err() {
            debug!("Mail worker already gone");
        }
        let mail_report = match mail_worker.await {
            Ok(report) => report,
            Err(e) => {
                errors.report(MAIL_ORIGIN, e);
                WorkerReport::default()
            }
        };

        if sink_stop.send(()).is_err() {
            debug!("Error sink already gone");
        }
        let errors_logged = match sink.await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Error sink task failed");
                0
            }
        };

        let report = ShutdownReport {
            mail: mail_report,
            errors_logged,
            mail_queue_closed: mail.is_closed(),
            error_channel_closed: errors.is_closed(),
        };
        drop(mail);
        drop(errors);

        info!(
            mails_received = report.mail.received,
            mails_delivered = report.mail.delivered,
            mails_failed = report.mail.failed,
            errors_logged = report.errors_logged,
            "Pipeline shut down"
        );
        report
    }
}
