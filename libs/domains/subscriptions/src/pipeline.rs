use crate::config::FulfillmentConfig;
use crate::coordinator::LifecycleCoordinator;
use crate::dispatcher::FulfillmentDispatcher;
use crate::generator::ManualGenerator;
use background::{CompletionTracker, ErrorSink};
use email::{MailTransport, MailWorker, MailerConfig};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// A running fulfillment pipeline.
pub struct Pipeline {
    /// Hand clones of this to request handlers
    pub dispatcher: FulfillmentDispatcher,
    /// Keep exactly one of these and call `shutdown` on exit
    pub coordinator: LifecycleCoordinator,
}

impl Pipeline {
    /// Create the mail queue, the error channel and both stop signals, and
    /// spawn the mail worker and error sink loops.
    ///
    /// Must be called from within a Tokio runtime, once per process.
    pub fn start<T: MailTransport>(
        mailer: &MailerConfig,
        fulfillment: FulfillmentConfig,
        transport: T,
        generator: Arc<dyn ManualGenerator>,
    ) -> Self {
        let tracker = CompletionTracker::new();
        let (errors, sink) = ErrorSink::channel();
        let (mail, worker) = MailWorker::new(mailer, transport, errors.clone(), tracker.clone());

        let (sink_stop, sink_stop_rx) = oneshot::channel();
        let sink = tokio::spawn(sink.run(sink_stop_rx));

        let (mail_stop, mail_stop_rx) = oneshot::channel();
        let mail_worker = tokio::spawn(worker.run(mail_stop_rx));

        info!(
            queue_capacity = mailer.queue_capacity,
            tmp_dir = %fulfillment.tmp_dir.display(),
            "Fulfillment pipeline started"
        );

        let dispatcher = FulfillmentDispatcher::new(
            mail.clone(),
            tracker.clone(),
            errors.clone(),
            generator,
            fulfillment,
        );
        let coordinator = LifecycleCoordinator::new(
            tracker,
            mail,
            errors,
            mail_stop,
            mail_worker,
            sink_stop,
            sink,
        );

        Self {
            dispatcher,
            coordinator,
        }
    }
}
