//! Mail transport implementations

pub mod mock;
pub mod smtp;

pub use mock::MockTransport;
pub use smtp::SmtpTransport;

use crate::error::MailResult;
use crate::message::EmailAttachment;
use async_trait::async_trait;
use lettre::message::Mailbox;

/// A fully rendered email, ready for the wire.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    /// Primary representation
    pub text_body: String,
    /// Alternative representation with styles already inlined
    pub html_body: String,
    pub attachments: Vec<EmailAttachment>,
}

impl OutboundEmail {
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.to.iter().any(|mailbox| mailbox.email.to_string() == address)
    }
}

/// Result of sending an email
#[derive(Debug)]
pub struct SendResult {
    /// Transport-specific message ID
    pub message_id: String,
}

/// An outbound mail capability.
///
/// Implementations open whatever connection they need per call; the worker
/// calls `send` from many tasks concurrently.
#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    async fn send(&self, email: &OutboundEmail) -> MailResult<SendResult>;

    fn name(&self) -> &'static str;
}
