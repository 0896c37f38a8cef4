//! Subscriptions Domain
//!
//! The asynchronous fulfillment pipeline that runs after a user subscribes
//! to a plan: an invoice email and a personalised PDF manual, both produced
//! in the background without holding up the request that triggered them.
//!
//! # Architecture
//!
//! ```text
//! handler ──► FulfillmentDispatcher ──┬─► invoice task ──┐
//!                                     └─► manual task ───┤ enqueue
//!                                          (generator)   ▼
//!                                                   MailWorker ──► transport
//!                     failures from any task ──► ErrorSink (logged)
//!
//! signal ──► LifecycleCoordinator: wait for tracker ─► stop worker ─► stop sink
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_subscriptions::{FulfillmentConfig, PdfManualGenerator, Pipeline, Plan, Subscriber};
//! use email::{MailerConfig, MockTransport};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let fulfillment = FulfillmentConfig::default();
//! let generator = Arc::new(PdfManualGenerator::from_config(&fulfillment));
//! let pipeline = Pipeline::start(
//!     &MailerConfig::default(),
//!     fulfillment,
//!     MockTransport::new(),
//!     generator,
//! );
//!
//! let subscriber = Subscriber {
//!     id: 1,
//!     email: "admin@example.com".into(),
//!     first_name: "Admin".into(),
//!     last_name: "User".into(),
//! };
//! let plan = Plan { id: 1, name: "Bronze Plan".into(), amount_cents: 1000 };
//! pipeline.dispatcher.dispatch(&subscriber, &plan);
//!
//! let report = pipeline.coordinator.shutdown().await;
//! assert_eq!(report.mail.received, 2);
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;

pub use config::FulfillmentConfig;
pub use coordinator::{LifecycleCoordinator, ShutdownReport};
pub use dispatcher::{
    FulfillmentDispatcher, INVOICE_ORIGIN, MANUAL_ATTACHMENT_NAME, MANUAL_ORIGIN, NOTIFICATION_ORIGIN,
};
pub use error::{FulfillmentError, FulfillmentResult};
pub use generator::{ManualGenerator, PdfManualGenerator};
pub use models::{Plan, Subscriber};
pub use pipeline::Pipeline;
