//! Fulfillment dispatch: the background work kicked off by a subscription.

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::generator::ManualGenerator;
use crate::models::{Plan, Subscriber};
use background::{CompletionTracker, ErrorReporter, TaskGuard};
use email::{MailHandle, Message};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INVOICE_ORIGIN: &str = "invoice";
pub const MANUAL_ORIGIN: &str = "manual";
pub const NOTIFICATION_ORIGIN: &str = "notification";

/// Display name of the manual attachment.
pub const MANUAL_ATTACHMENT_NAME: &str = "Manual.pdf";

/// Launches tracked background tasks for subscription events.
///
/// Cheap to clone; every clone shares the same mail queue, tracker and
/// error channel. All methods return immediately and must be called from
/// within a Tokio runtime.
#[derive(Clone)]
pub struct FulfillmentDispatcher {
    mail: MailHandle,
    tracker: CompletionTracker,
    errors: ErrorReporter,
    generator: Arc<dyn ManualGenerator>,
    config: Arc<FulfillmentConfig>,
}

impl FulfillmentDispatcher {
    pub fn new(
        mail: MailHandle,
        tracker: CompletionTracker,
        errors: ErrorReporter,
        generator: Arc<dyn ManualGenerator>,
        config: FulfillmentConfig,
    ) -> Self {
        Self {
            mail,
            tracker,
            errors,
            generator,
            config: Arc::new(config),
        }
    }

    /// Send the invoice and the personalised manual for a new subscription.
    ///
    /// Both tasks are registered before either starts, run independently and
    /// report their own failures.
    pub fn dispatch(&self, subscriber: &Subscriber, plan: &Plan) {
        let invoice_guard = self.tracker.register();
        let manual_guard = self.tracker.register();
        info!(user_id = subscriber.id, plan = %plan.name, "Dispatching fulfillment");

        let this = self.clone();
        let (s, p) = (subscriber.clone(), plan.clone());
        self.spawn_tracked(invoice_guard, INVOICE_ORIGIN, async move {
            this.send_invoice(&s, &p).await
        });

        let this = self.clone();
        let (s, p) = (subscriber.clone(), plan.clone());
        self.spawn_tracked(manual_guard, MANUAL_ORIGIN, async move {
            this.deliver_manual(&s, &p).await
        });
    }

    /// Tell a user someone failed to log in to their account.
    pub fn notify_failed_login(&self, email: &str) {
        let message = Message::new(email, "Failed to Log In").with_data("Invalid login attempt");
        self.spawn_notification(message);
    }

    /// Send the account activation link to a newly registered user.
    pub fn send_activation(&self, email: &str, activation_url: &str) {
        let message = Message::new(email, "Activate Your Account")
            .with_template("confirmation-email")
            .with_data(activation_url);
        self.spawn_notification(message);
    }

    fn spawn_notification(&self, message: Message) {
        let guard = self.tracker.register();
        let mail = self.mail.clone();
        self.spawn_tracked(guard, NOTIFICATION_ORIGIN, async move {
            mail.enqueue(message).await?;
            Ok(())
        });
    }

    /// Run `work` on its own task and release `guard` once it has finished.
    ///
    /// A returned error or a panic is reported before the guard is released.
    fn spawn_tracked<F>(&self, guard: TaskGuard, origin: &'static str, work: F)
    where
        F: Future<Output = FulfillmentResult<()>> + Send + 'static,
    {
        let errors = self.errors.clone();
        tokio::spawn(async move {
            match tokio::spawn(work).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(origin, error = %e, "Fulfillment task failed");
                    errors.report(origin, e);
                }
                Err(e) => {
                    warn!(origin, error = %e, "Fulfillment task panicked");
                    errors.report(origin, e);
                }
            }
            guard.complete();
        });
    }

    async fn send_invoice(&self, subscriber: &Subscriber, plan: &Plan) -> FulfillmentResult<()> {
        let message = Message::new(&subscriber.email, "Your Invoice Data")
            .with_template("invoice")
            .with_data(plan.invoice_text())
            .with_data_entry("plan", plan.name.as_str());

        self.mail.enqueue(message).await?;
        debug!(user_id = subscriber.id, "Invoice queued");
        Ok(())
    }

    async fn deliver_manual(&self, subscriber: &Subscriber, plan: &Plan) -> FulfillmentResult<()> {
        let pdf = self.generate_manual(subscriber, plan).await?;
        let path = self.write_artifact(subscriber, pdf).await?;

        let message = Message::new(&subscriber.email, "Your Manual")
            .with_data("Your manual is attached")
            .with_named_attachment(MANUAL_ATTACHMENT_NAME, path);

        self.mail.enqueue(message).await?;
        debug!(user_id = subscriber.id, "Manual queued");
        Ok(())
    }

    /// Run the generator on the blocking pool under the configured deadline.
    ///
    /// On timeout the render thread is left to finish on its own; its result
    /// is discarded.
    async fn generate_manual(&self, subscriber: &Subscriber, plan: &Plan) -> FulfillmentResult<Vec<u8>> {
        let generator = Arc::clone(&self.generator);
        let (s, p) = (subscriber.clone(), plan.clone());
        let deadline = self.config.generation_timeout;

        let render = tokio::task::spawn_blocking(move || generator.generate(&s, &p));
        match tokio::time::timeout(deadline, render).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(FulfillmentError::Generation(join_error.to_string())),
            Err(_) => Err(FulfillmentError::GenerationTimeout(deadline)),
        }
    }

    async fn write_artifact(&self, subscriber: &Subscriber, pdf: Vec<u8>) -> FulfillmentResult<PathBuf> {
        let dir = &self.config.tmp_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| FulfillmentError::Artifact {
                path: dir.clone(),
                source,
            })?;

        let path = dir.join(format!("{}_manual.pdf", subscriber.id));
        tokio::fs::write(&path, pdf)
            .await
            .map_err(|source| FulfillmentError::Artifact {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}
