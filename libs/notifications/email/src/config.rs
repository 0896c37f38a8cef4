//! Mail worker configuration.

use core_config::{env_duration_secs, env_or_default, env_parse, ConfigError, FromEnv};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::message::SenderDefaults;

/// Transport encryption mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encryption {
    /// Plain SMTP (local relays such as Mailpit)
    None,
    /// Opportunistic upgrade via STARTTLS
    #[default]
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
}

impl Encryption {
    /// Parse the configuration spelling: `none`, `tls` (STARTTLS) or `ssl`
    /// (implicit TLS). Anything else selects STARTTLS.
    pub fn from_config_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "ssl" => Self::Tls,
            _ => Self::StartTls,
        }
    }
}

/// Everything the mail worker needs; built once at startup.
#[derive(Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: Encryption,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub from_address: String,
    pub from_name: String,
    pub template_dir: PathBuf,
    pub queue_capacity: usize,
}

impl MailerConfig {
    /// Local relay on 127.0.0.1:1025 without auth or TLS
    pub fn local(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            ..Self::default()
        }
    }

    pub fn sender_defaults(&self) -> SenderDefaults {
        SenderDefaults {
            address: self.from_address.clone(),
            name: self.from_name.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            encryption: Encryption::None,
            connect_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(10),
            from_address: "info@myco.com".to_string(),
            from_name: "no-reply".to_string(),
            template_dir: PathBuf::from("./templates"),
            queue_capacity: 100,
        }
    }
}

impl fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("encryption", &self.encryption)
            .field("connect_timeout", &self.connect_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("template_dir", &self.template_dir)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl FromEnv for MailerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let queue_capacity = env_parse("MAIL_QUEUE_CAPACITY", 100usize)?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAIL_QUEUE_CAPACITY".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: env_or_default("SMTP_HOST", "127.0.0.1"),
            port: env_parse("SMTP_PORT", 1025u16)?,
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            encryption: Encryption::from_config_value(&env_or_default("SMTP_ENCRYPTION", "none")),
            connect_timeout: env_duration_secs("SMTP_CONNECT_TIMEOUT_SECS", 10)?,
            send_timeout: env_duration_secs("SMTP_SEND_TIMEOUT_SECS", 10)?,
            from_address: env_or_default("EMAIL_FROM_ADDRESS", "info@myco.com"),
            from_name: env_or_default("EMAIL_FROM_NAME", "no-reply"),
            template_dir: PathBuf::from(env_or_default("EMAIL_TEMPLATE_DIR", "./templates")),
            queue_capacity,
        })
    }
}
