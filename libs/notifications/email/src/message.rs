//! The outbound notification unit and its default resolution.

use lettre::message::Mailbox;
use lettre::Address;
use mime_guess::Mime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MailError, MailResult};

/// Template used when a message names none.
pub const DEFAULT_TEMPLATE: &str = "mail";

/// Key under which the primary payload is exposed to templates.
pub const PAYLOAD_KEY: &str = "message";

/// Sender identity used when a message does not carry its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderDefaults {
    pub address: String,
    pub name: String,
}

/// A unit of outbound notification work.
///
/// Once handed to [`MailHandle::enqueue`](crate::MailHandle::enqueue) the
/// message is owned by the worker and never mutated; defaults are resolved
/// into a separate [`PreparedMessage`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Sender address (defaults to the configured from address)
    pub from: Option<String>,
    /// Sender display name (defaults to the configured from name)
    pub from_name: Option<String>,
    /// Recipients; must not be empty
    pub to: Vec<String>,
    pub subject: String,
    /// Files attached under their own file name
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
    /// Files attached under a display name (display name -> path)
    #[serde(default)]
    pub named_attachments: BTreeMap<String, PathBuf>,
    /// Primary payload, exposed to templates as `{{message}}`
    #[serde(default)]
    pub data: Value,
    /// Auxiliary template data
    #[serde(default)]
    pub data_map: Map<String, Value>,
    /// Template identifier (defaults to [`DEFAULT_TEMPLATE`])
    pub template: Option<String>,
}

impl Message {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_recipient(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn with_from(mut self, address: impl Into<String>, name: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self.from_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_data_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data_map.insert(key.into(), value.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    pub fn with_named_attachment(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.named_attachments.insert(name.into(), path.into());
        self
    }

    /// Template that will actually be rendered; empty names count as unset.
    pub fn template_name(&self) -> &str {
        match self.template.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_TEMPLATE,
        }
    }

    /// Resolve defaults and validate addresses without touching `self`.
    pub fn prepare(&self, defaults: &SenderDefaults) -> MailResult<PreparedMessage> {
        if self.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let from_address = non_empty(self.from.as_deref()).unwrap_or(defaults.address.as_str());
        let from_name = non_empty(self.from_name.as_deref()).unwrap_or(defaults.name.as_str());
        let from = Mailbox::new(
            non_empty(Some(from_name)).map(str::to_string),
            parse_address(from_address)?,
        );

        let to = self
            .to
            .iter()
            .map(|recipient| parse_mailbox(recipient))
            .collect::<MailResult<Vec<_>>>()?;

        let mut data = self.data_map.clone();
        data.insert(PAYLOAD_KEY.to_string(), self.data.clone());

        let attachments = self
            .attachments
            .iter()
            .map(|path| EmailAttachment::from_path(path))
            .chain(
                self.named_attachments
                    .iter()
                    .map(|(name, path)| EmailAttachment::named(name, path)),
            )
            .collect();

        Ok(PreparedMessage {
            from,
            to,
            subject: self.subject.clone(),
            template: self.template_name().to_string(),
            data: Value::Object(data),
            attachments,
        })
    }
}

/// A message with every default filled in, ready for rendering.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub template: String,
    /// Template data; always an object containing [`PAYLOAD_KEY`]
    pub data: Value,
    pub attachments: Vec<EmailAttachment>,
}

/// A file to attach and the name the recipient sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub path: PathBuf,
}

impl EmailAttachment {
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        Self {
            filename,
            path: path.to_path_buf(),
        }
    }

    pub fn named(name: &str, path: &Path) -> Self {
        Self {
            filename: name.to_string(),
            path: path.to_path_buf(),
        }
    }

    /// MIME type guessed from the file extension
    pub fn mime_type(&self) -> Mime {
        mime_guess::from_path(&self.path).first_or_octet_stream()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_address(address: &str) -> MailResult<Address> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        details: e.to_string(),
    })
}

fn parse_mailbox(mailbox: &str) -> MailResult<Mailbox> {
    mailbox.trim().parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: mailbox.to_string(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> SenderDefaults {
        SenderDefaults {
            address: "info@myco.com".to_string(),
            name: "no-reply".to_string(),
        }
    }

    #[test]
    fn test_empty_template_falls_back_to_default() {
        let unset = Message::new("a@x.com", "S");
        let empty = Message::new("a@x.com", "S").with_template("");
        let named = Message::new("a@x.com", "S").with_template("invoice");

        assert_eq!(unset.template_name(), DEFAULT_TEMPLATE);
        assert_eq!(empty.template_name(), DEFAULT_TEMPLATE);
        assert_eq!(named.template_name(), "invoice");
    }

    #[test]
    fn test_prepare_applies_sender_defaults() {
        let prepared = Message::new("a@x.com", "S").prepare(&defaults()).unwrap();

        assert_eq!(prepared.from.email.to_string(), "info@myco.com");
        assert_eq!(prepared.from.name.as_deref(), Some("no-reply"));
        assert_eq!(prepared.template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_prepare_keeps_explicit_sender() {
        let prepared = Message::new("a@x.com", "S")
            .with_from("billing@myco.com", "Billing")
            .prepare(&defaults())
            .unwrap();

        assert_eq!(prepared.from.email.to_string(), "billing@myco.com");
        assert_eq!(prepared.from.name.as_deref(), Some("Billing"));
    }

    #[test]
    fn test_prepare_merges_payload_under_message_key() {
        let message = Message::new("a@x.com", "S")
            .with_data("42.00")
            .with_data_entry("plan", "Gold");
        let prepared = message.prepare(&defaults()).unwrap();

        assert_eq!(prepared.data, json!({ "message": "42.00", "plan": "Gold" }));
        // The submitted message is left untouched.
        assert!(!message.data_map.contains_key(PAYLOAD_KEY));
    }

    #[test]
    fn test_prepare_rejects_missing_or_invalid_recipients() {
        let mut message = Message::new("a@x.com", "S");
        message.to.clear();
        assert!(matches!(message.prepare(&defaults()), Err(MailError::NoRecipients)));

        let invalid = Message::new("not-an-address", "S");
        assert!(matches!(
            invalid.prepare(&defaults()),
            Err(MailError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_prepare_collects_all_attachments() {
        let prepared = Message::new("a@x.com", "S")
            .with_attachment("/tmp/report.csv")
            .with_named_attachment("Manual.pdf", "/tmp/7_manual.pdf")
            .prepare(&defaults())
            .unwrap();

        assert_eq!(
            prepared.attachments,
            vec![
                EmailAttachment::named("report.csv", Path::new("/tmp/report.csv")),
                EmailAttachment::named("Manual.pdf", Path::new("/tmp/7_manual.pdf")),
            ]
        );
        assert_eq!(prepared.attachments[1].mime_type().essence_str(), "application/pdf");
    }

    #[test]
    fn test_mime_type_is_guessed_from_the_path() {
        let guess = |path: &str| EmailAttachment::from_path(Path::new(path)).mime_type().essence_str().to_string();

        assert_eq!(guess("/tmp/logo.gif"), "image/gif");
        assert_eq!(guess("/tmp/bundle.zip"), "application/zip");
        assert_eq!(guess("/tmp/data.json"), "application/json");
        assert_eq!(guess("/tmp/REPORT.CSV"), "text/csv");
        assert_eq!(guess("/tmp/no-extension"), "application/octet-stream");
    }

    #[test]
    fn test_multiple_recipients() {
        let prepared = Message::new("a@x.com", "S")
            .with_recipient("Bob <b@x.com>")
            .prepare(&defaults())
            .unwrap();

        assert_eq!(prepared.to.len(), 2);
        assert_eq!(prepared.to[1].email.to_string(), "b@x.com");
    }
}
