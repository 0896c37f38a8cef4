//! Error types for message rendering and delivery.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Everything that can go wrong between enqueueing a message and the
/// transport accepting it. Each variant is a per-message failure: the worker
/// reports it and moves on to the next message.
#[derive(Debug, Error)]
pub enum MailError {
    /// The mail queue has been closed by shutdown
    #[error("mail queue is closed")]
    QueueClosed,

    /// A message without any recipient
    #[error("message has no recipients")]
    NoRecipients,

    /// A sender or recipient that is not a valid mailbox
    #[error("invalid address '{address}': {details}")]
    InvalidAddress { address: String, details: String },

    /// Template identifiers are plain names, never paths
    #[error("invalid template name '{0}'")]
    InvalidTemplate(String),

    /// One of the two template variants does not exist
    #[error("template '{template}' not found at {}", path.display())]
    TemplateNotFound { template: String, path: PathBuf },

    /// The template exists but could not be read, parsed or rendered
    #[error("failed to render template '{template}': {details}")]
    Render { template: String, details: String },

    /// CSS inlining of the HTML body failed
    #[error("failed to inline styles: {0}")]
    StyleInline(String),

    /// An attachment file could not be read
    #[error("failed to read attachment {}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transport-ready email could not be assembled
    #[error("failed to build email: {0}")]
    Build(String),

    /// Connecting to or talking to the mail transport failed
    #[error("mail transport error: {0}")]
    Transport(String),

    /// The transport did not finish sending in time
    #[error("mail transport timed out after {0:?}")]
    Timeout(Duration),
}
