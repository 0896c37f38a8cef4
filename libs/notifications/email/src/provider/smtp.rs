//! SMTP transport using lettre

use super::{MailTransport, OutboundEmail, SendResult};
use crate::config::{Encryption, MailerConfig};
use crate::error::{MailError, MailResult};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{debug, info};

/// SMTP transport.
///
/// Built without connection pooling, so every send opens its own session
/// bounded by the connect timeout; the whole send is bounded by the send
/// timeout.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    send_timeout: Duration,
}

impl SmtpTransport {
    pub fn new(config: &MailerConfig) -> MailResult<Self> {
        let builder = match config.encryption {
            Encryption::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            Encryption::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(format!("failed to create STARTTLS relay: {}", e)))?,
            Encryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(format!("failed to create TLS relay: {}", e)))?,
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(config.connect_timeout));

        if config.has_credentials() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        info!(
            host = %config.host,
            port = config.port,
            encryption = ?config.encryption,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
            send_timeout: config.send_timeout,
        })
    }

    async fn build_message(&self, email: &OutboundEmail) -> MailResult<Message> {
        let mut builder = Message::builder()
            .from(email.from.clone())
            .subject(&email.subject);

        for to in &email.to {
            builder = builder.to(to.clone());
        }

        let body = MultiPart::alternative_plain_html(email.text_body.clone(), email.html_body.clone());

        let message = if email.attachments.is_empty() {
            builder.multipart(body)
        } else {
            let mut mixed = MultiPart::mixed().multipart(body);
            for attachment in &email.attachments {
                let content = tokio::fs::read(&attachment.path)
                    .await
                    .map_err(|source| MailError::Attachment {
                        path: attachment.path.clone(),
                        source,
                    })?;
                let content_type = ContentType::parse(attachment.mime_type().as_ref())
                    .map_err(|e| MailError::Build(e.to_string()))?;

                debug!(filename = %attachment.filename, bytes = content.len(), "Attaching file");
                mixed = mixed.singlepart(Attachment::new(attachment.filename.clone()).body(content, content_type));
            }
            builder.multipart(mixed)
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: &OutboundEmail) -> MailResult<SendResult> {
        let message = self.build_message(email).await?;

        let response = tokio::time::timeout(self.send_timeout, self.transport.send(message))
            .await
            .map_err(|_| MailError::Timeout(self.send_timeout))?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_default();

        Ok(SendResult { message_id })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{EmailAttachment, Message, SenderDefaults};
    use std::path::PathBuf;

    fn outbound(attachments: Vec<EmailAttachment>) -> OutboundEmail {
        let prepared = Message::new("a@x.com", "S")
            .prepare(&SenderDefaults {
                address: "info@myco.com".to_string(),
                name: "no-reply".to_string(),
            })
            .unwrap();

        OutboundEmail {
            from: prepared.from,
            to: prepared.to,
            subject: prepared.subject,
            text_body: "plain".to_string(),
            html_body: "<p>html</p>".to_string(),
            attachments,
        }
    }

    #[tokio::test]
    async fn test_build_message_with_alternative_bodies() {
        let transport = SmtpTransport::new(&MailerConfig::default()).unwrap();

        let message = transport.build_message(&outbound(Vec::new())).await.unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: S"));
        assert!(raw.contains("info@myco.com"));
    }

    #[tokio::test]
    async fn test_build_message_attaches_named_file() {
        let transport = SmtpTransport::new(&MailerConfig::default()).unwrap();
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates/mail.plain.hbs");

        let email = outbound(vec![EmailAttachment::named("Notes.txt", &path)]);
        let raw = String::from_utf8(transport.build_message(&email).await.unwrap().formatted()).unwrap();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Notes.txt"));
    }

    #[tokio::test]
    async fn test_missing_attachment_is_an_error() {
        let transport = SmtpTransport::new(&MailerConfig::default()).unwrap();
        let email = outbound(vec![EmailAttachment::named("Gone.pdf", std::path::Path::new("/nonexistent/gone.pdf"))]);

        let err = transport.build_message(&email).await.unwrap_err();
        assert!(matches!(err, MailError::Attachment { .. }));
    }

    #[tokio::test]
    async fn test_send_to_unreachable_host_fails() {
        let config = MailerConfig {
            port: 1,
            connect_timeout: Duration::from_millis(200),
            send_timeout: Duration::from_secs(2),
            ..MailerConfig::default()
        };
        let transport = SmtpTransport::new(&config).unwrap();

        let result = transport.send(&outbound(Vec::new())).await;
        assert!(matches!(result, Err(MailError::Transport(_)) | Err(MailError::Timeout(_))));
    }
}
