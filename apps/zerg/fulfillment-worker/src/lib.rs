//! Fulfillment Worker Service
//!
//! Hosts the subscription fulfillment pipeline behind a small HTTP surface.
//!
//! ## Architecture
//!
//! ```text
//! POST /subscriptions ──► FulfillmentDispatcher ──► background tasks
//!                                                      ↓
//!                                          MailWorker ──► SMTP
//!
//! SIGINT / SIGTERM ──► stop accepting requests ──► LifecycleCoordinator::shutdown
//! ```
//!
//! ## Endpoints
//!
//! - `GET /health`: liveness
//! - `POST /subscriptions`: `{ "subscriber": {...}, "plan": {...} }`, answers
//!   `202 Accepted` as soon as the work is dispatched

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use core_config::{env_or_default, env_parse, Environment, FromEnv};
use domain_subscriptions::{FulfillmentConfig, FulfillmentDispatcher, PdfManualGenerator, Pipeline, Plan, Subscriber};
use email::{MailerConfig, SmtpTransport};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// Body of `POST /subscriptions`
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub subscriber: Subscriber,
    pub plan: Plan,
}

pub fn router(dispatcher: FulfillmentDispatcher) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/subscriptions", post(subscribe))
        .with_state(dispatcher)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn subscribe(
    State(dispatcher): State<FulfillmentDispatcher>,
    Json(request): Json<SubscriptionRequest>,
) -> StatusCode {
    dispatcher.dispatch(&request.subscriber, &request.plan);
    StatusCode::ACCEPTED
}

/// Run the fulfillment worker
///
/// 1. Sets up error reporting and structured logging
/// 2. Loads mailer and fulfillment configuration
/// 3. Starts the pipeline and the HTTP server
/// 4. On SIGINT/SIGTERM stops the server, then drains and stops the pipeline
///
/// # Errors
///
/// Returns an error if configuration is invalid, the SMTP transport cannot
/// be built, the listener cannot bind or the server fails.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = ?environment,
        "Starting fulfillment worker"
    );

    let mailer = MailerConfig::from_env().wrap_err("Failed to load mailer configuration")?;
    let fulfillment = FulfillmentConfig::from_env().wrap_err("Failed to load fulfillment configuration")?;
    let host = env_or_default("HOST", "0.0.0.0");
    let port: u16 = env_parse("PORT", 8080).wrap_err("Failed to load server configuration")?;

    let transport = SmtpTransport::new(&mailer).wrap_err("Failed to build SMTP transport")?;
    let generator = Arc::new(PdfManualGenerator::from_config(&fulfillment));
    let Pipeline {
        dispatcher,
        coordinator,
    } = Pipeline::start(&mailer, fulfillment, transport, generator);

    let addr = format!("{host}:{port}");
    let served = match TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!(%addr, "HTTP server listening");
            axum::serve(listener, router(dispatcher))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .wrap_err("HTTP server failed")
        }
        Err(e) => Err(e).wrap_err_with(|| format!("Failed to bind to {addr}")),
    };

    // The pipeline is drained even when the server failed.
    let report = coordinator.shutdown().await;
    info!(
        mails_delivered = report.mail.delivered,
        mails_failed = report.mail.failed,
        errors_logged = report.errors_logged,
        "Fulfillment worker stopped"
    );

    served
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use email::MockTransport;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn pipeline(transport: MockTransport) -> Pipeline {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../..");
        let mailer = MailerConfig::local(root.join("libs/notifications/email/templates"));
        let fulfillment = FulfillmentConfig {
            tmp_dir: std::env::temp_dir().join(format!("fulfillment-worker-{}", std::process::id())),
            manual_source_path: root.join("libs/domains/subscriptions/assets/manual.txt"),
            ..FulfillmentConfig::default()
        };
        let generator = Arc::new(PdfManualGenerator::from_config(&fulfillment));
        Pipeline::start(&mailer, fulfillment, transport, generator)
    }

    #[tokio::test]
    async fn test_health() {
        let Pipeline {
            dispatcher,
            coordinator,
        } = pipeline(MockTransport::new());

        let response = router(dispatcher)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribe_accepts_and_fulfils_in_background() {
        let transport = MockTransport::new();
        let Pipeline {
            dispatcher,
            coordinator,
        } = pipeline(transport.clone());

        let body = json!({
            "subscriber": {
                "id": 3,
                "email": "admin@example.com",
                "first_name": "Admin",
                "last_name": "User"
            },
            "plan": { "id": 2, "name": "Silver Plan", "amount_cents": 2000 }
        });
        let request = Request::post("/subscriptions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router(dispatcher).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let report = coordinator.shutdown().await;
        assert_eq!(report.mail.delivered, 2);
        assert!(transport.was_sent_to("admin@example.com").await);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_malformed_body() {
        let Pipeline {
            dispatcher,
            coordinator,
        } = pipeline(MockTransport::new());

        let request = Request::post("/subscriptions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"plan": {}}"#))
            .unwrap();

        let response = router(dispatcher).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());

        let report = coordinator.shutdown().await;
        assert_eq!(report.mail.received, 0);
    }
}
