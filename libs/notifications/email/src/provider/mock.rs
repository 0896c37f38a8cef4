//! In-memory transport for tests and local runs

use super::{MailTransport, OutboundEmail, SendResult};
use crate::error::{MailError, MailResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Transport that records emails instead of sending them
#[derive(Clone, Default)]
pub struct MockTransport {
    sent_emails: Arc<Mutex<Vec<OutboundEmail>>>,
    failure_message: Option<String>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Wait `delay` before each send completes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn sent_emails(&self) -> Vec<OutboundEmail> {
        self.sent_emails.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent_emails
            .lock()
            .await
            .iter()
            .any(|email| email.is_addressed_to(address))
    }

    pub async fn clear(&self) {
        self.sent_emails.lock().await.clear();
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, email: &OutboundEmail) -> MailResult<SendResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure_message {
            return Err(MailError::Transport(message.clone()));
        }

        self.sent_emails.lock().await.push(email.clone());

        Ok(SendResult {
            message_id: format!("mock-{}", uuid::Uuid::new_v4()),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
