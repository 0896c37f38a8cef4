//! The mail worker: a bounded queue of [`Message`]s and the loop that
//! renders and delivers them.
//!
//! ```text
//! MailHandle::enqueue ──► bounded mpsc ──► MailWorker::run
//!                                              │ spawn per message
//!                                              ▼
//!                     prepare ─► render html + plain ─► inline css ─► transport
//!                                              │ failure
//!                                              ▼
//!                                        ErrorReporter
//! ```

use crate::config::MailerConfig;
use crate::error::{MailError, MailResult};
use crate::inline::inline_styles;
use crate::message::{Message, SenderDefaults};
use crate::provider::{MailTransport, OutboundEmail, SendResult};
use crate::templates::{TemplateRenderer, TemplateVariant};
use background::{CompletionTracker, ErrorReporter, TaskGuard};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Origin tag for errors reported by the worker.
pub const MAIL_ORIGIN: &str = "mail";

/// A message waiting in the queue, together with its tracker registration.
struct QueuedMessage {
    message: Message,
    guard: TaskGuard,
}

/// Producer handle for the mail queue.
///
/// Every enqueued message is registered with the shared
/// [`CompletionTracker`] until its delivery attempt has finished, so draining
/// the tracker also drains the mail queue.
#[derive(Clone)]
pub struct MailHandle {
    tx: mpsc::Sender<QueuedMessage>,
    tracker: CompletionTracker,
}

impl MailHandle {
    /// Submit a message for delivery.
    ///
    /// Waits while the queue is full. Callers on a latency-sensitive path
    /// should enqueue from a spawned task.
    pub async fn enqueue(&self, message: Message) -> MailResult<()> {
        let guard = self.tracker.register();
        debug!(to = ?message.to, subject = %message.subject, "Enqueueing message");

        // On failure the queued message, and with it the guard, is dropped.
        self.tx
            .send(QueuedMessage { message, guard })
            .await
            .map_err(|_| MailError::QueueClosed)
    }

    /// True once the worker has stopped accepting messages.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots currently left in the queue.
    pub fn available_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// What the worker did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Messages taken off the queue
    pub received: usize,
    /// Messages the transport accepted
    pub delivered: usize,
    /// Messages that failed at any step
    pub failed: usize,
}

struct Delivery<T> {
    transport: T,
    renderer: TemplateRenderer,
    defaults: SenderDefaults,
    errors: ErrorReporter,
}

impl<T: MailTransport> Delivery<T> {
    async fn deliver(&self, message: &Message) -> MailResult<SendResult> {
        let prepared = message.prepare(&self.defaults)?;

        let html = self
            .renderer
            .render(&prepared.template, TemplateVariant::Html, &prepared.data)
            .await?;
        let text_body = self
            .renderer
            .render(&prepared.template, TemplateVariant::Plain, &prepared.data)
            .await?;
        let html_body = inline_styles(&html)?;

        let email = OutboundEmail {
            from: prepared.from,
            to: prepared.to,
            subject: prepared.subject,
            text_body,
            html_body,
            attachments: prepared.attachments,
        };

        self.transport.send(&email).await
    }

    /// Deliver one message; returns whether it was accepted.
    ///
    /// The failure is reported before the tracker registration is released,
    /// so a drained tracker implies every error has reached the sink.
    async fn process(self: Arc<Self>, queued: QueuedMessage) -> bool {
        let QueuedMessage { message, guard } = queued;

        let delivered = match self.deliver(&message).await {
            Ok(result) => {
                info!(
                    to = ?message.to,
                    subject = %message.subject,
                    template = %message.template_name(),
                    message_id = %result.message_id,
                    transport = self.transport.name(),
                    "Email sent"
                );
                true
            }
            Err(e) => {
                warn!(to = ?message.to, subject = %message.subject, error = %e, "Email delivery failed");
                self.errors.report(MAIL_ORIGIN, e);
                false
            }
        };

        drop(guard);
        delivered
    }
}

/// Single consumer of the mail queue.
pub struct MailWorker<T> {
    rx: mpsc::Receiver<QueuedMessage>,
    delivery: Arc<Delivery<T>>,
}

impl<T: MailTransport> MailWorker<T> {
    /// Create the mail queue and its worker. Call once per process.
    pub fn new(
        config: &MailerConfig,
        transport: T,
        errors: ErrorReporter,
        tracker: CompletionTracker,
    ) -> (MailHandle, Self) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let delivery = Delivery {
            transport,
            renderer: TemplateRenderer::new(config.template_dir.clone()),
            defaults: config.sender_defaults(),
            errors,
        };

        (
            MailHandle { tx, tracker },
            Self {
                rx,
                delivery: Arc::new(delivery),
            },
        )
    }

    /// Run until `stop` fires (or its sender is dropped).
    ///
    /// Each dequeued message is delivered on its own task, so deliveries
    /// complete in any order. Running out of messages never ends the loop;
    /// only the stop signal does. On stop the queue is closed, messages
    /// still buffered are delivered, and all in-flight deliveries are joined
    /// before returning.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> WorkerReport {
        info!(
            transport = self.delivery.transport.name(),
            template_dir = %self.delivery.renderer.dir().display(),
            "Mail worker started"
        );

        let mut in_flight: JoinSet<bool> = JoinSet::new();
        let mut report = WorkerReport::default();

        loop {
            tokio::select! {
                Some(queued) = self.rx.recv() => {
                    report.received += 1;
                    in_flight.spawn(Arc::clone(&self.delivery).process(queued));
                }
                Some(joined) = in_flight.join_next() => {
                    self.record(&mut report, joined);
                }
                _ = &mut stop => {
                    info!("Mail worker received stop signal");
                    break;
                }
            }
        }

        self.rx.close();
        while let Some(queued) = self.rx.recv().await {
            report.received += 1;
            in_flight.spawn(Arc::clone(&self.delivery).process(queued));
        }
        while let Some(joined) = in_flight.join_next().await {
            self.record(&mut report, joined);
        }

        info!(
            received = report.received,
            delivered = report.delivered,
            failed = report.failed,
            "Mail worker stopped"
        );
        report
    }

    fn record(&self, report: &mut WorkerReport, joined: Result<bool, JoinError>) {
        match joined {
            Ok(true) => report.delivered += 1,
            Ok(false) => report.failed += 1,
            Err(e) => {
                report.failed += 1;
                self.delivery.errors.report(MAIL_ORIGIN, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockTransport;
    use background::ErrorSink;
    use std::time::Duration;

    fn config() -> MailerConfig {
        MailerConfig::local(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
    }

    #[tokio::test]
    async fn test_enqueue_registers_with_tracker_until_delivered() {
        let tracker = CompletionTracker::new();
        let (reporter, _sink) = ErrorSink::channel();
        let transport = MockTransport::new();
        let (handle, worker) = MailWorker::new(&config(), transport.clone(), reporter, tracker.clone());

        handle.enqueue(Message::new("a@x.com", "Hello")).await.unwrap();
        assert_eq!(tracker.pending(), 1);

        let (stop_tx, stop_rx) = oneshot::channel();
        let running = tokio::spawn(worker.run(stop_rx));

        tokio::time::timeout(Duration::from_secs(5), tracker.wait_idle())
            .await
            .unwrap();
        assert_eq!(transport.sent_count().await, 1);

        stop_tx.send(()).unwrap();
        let report = running.await.unwrap();
        assert_eq!(report, WorkerReport { received: 1, delivered: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_enqueue_after_stop_fails_and_releases_tracker() {
        let tracker = CompletionTracker::new();
        let (reporter, _sink) = ErrorSink::channel();
        let (handle, worker) = MailWorker::new(&config(), MockTransport::new(), reporter, tracker.clone());

        let (stop_tx, stop_rx) = oneshot::channel();
        stop_tx.send(()).unwrap();
        worker.run(stop_rx).await;

        assert!(handle.is_closed());
        let err = handle.enqueue(Message::new("a@x.com", "Late")).await.unwrap_err();
        assert!(matches!(err, MailError::QueueClosed));
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let tracker = CompletionTracker::new();
        let (reporter, _sink) = ErrorSink::channel();
        let config = MailerConfig {
            queue_capacity: 1,
            ..config()
        };
        let (handle, worker) = MailWorker::new(&config, MockTransport::new(), reporter, tracker);

        handle.enqueue(Message::new("a@x.com", "First")).await.unwrap();
        assert_eq!(handle.available_capacity(), 0);

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            handle.enqueue(Message::new("a@x.com", "Second")),
        )
        .await;
        assert!(blocked.is_err(), "enqueue on a full queue must wait");

        drop(worker);
    }
}
