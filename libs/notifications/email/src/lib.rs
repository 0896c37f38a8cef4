//! Transactional email delivery for the fulfillment pipeline.
//!
//! ## Components
//!
//! - **Message model**: [`Message`] is the unit of outbound work; defaults
//!   are resolved into a [`PreparedMessage`] by the worker.
//! - **Mail worker**: [`MailWorker`] consumes a bounded queue fed through
//!   [`MailHandle`], renders `{template}.html.hbs` and `{template}.plain.hbs`,
//!   inlines CSS into the HTML body and hands the result to a
//!   [`MailTransport`].
//! - **Transports**: [`SmtpTransport`] (lettre) and [`MockTransport`]
//!   (in-memory, always available).
//!
//! Per-message failures never stop the worker; they are sent to the shared
//! error sink from the `background` crate.
//!
//! ## Usage
//!
//! ```ignore
//! use background::{CompletionTracker, ErrorSink};
//! use email::{MailWorker, MailerConfig, Message, SmtpTransport};
//!
//! let config = MailerConfig::from_env()?;
//! let tracker = CompletionTracker::new();
//! let (reporter, sink) = ErrorSink::channel();
//! let (mail, worker) = MailWorker::new(&config, SmtpTransport::new(&config)?, reporter, tracker);
//!
//! let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
//! let worker = tokio::spawn(worker.run(stop_rx));
//!
//! mail.enqueue(Message::new("user@example.com", "Hello").with_data("Hi there")).await?;
//! ```

pub mod config;
pub mod error;
pub mod inline;
pub mod message;
pub mod provider;
pub mod templates;
pub mod worker;

pub use config::{Encryption, MailerConfig};
pub use error::{MailError, MailResult};
pub use message::{EmailAttachment, Message, PreparedMessage, SenderDefaults, DEFAULT_TEMPLATE, PAYLOAD_KEY};
pub use provider::{MailTransport, MockTransport, OutboundEmail, SendResult, SmtpTransport};
pub use templates::{TemplateRenderer, TemplateVariant};
pub use worker::{MailHandle, MailWorker, WorkerReport, MAIL_ORIGIN};
