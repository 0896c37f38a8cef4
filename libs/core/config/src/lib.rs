//! Environment-driven configuration shared by every pipeline crate.
//!
//! Configuration is read exactly once at process start through [`FromEnv`]
//! and treated as read-only afterwards.

pub mod tracing;

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Invalid value for '{key}': {details}")]
    InvalidValue { key: String, details: String },
}

/// Application environment (selects the log format)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable or return [`ConfigError::MissingEnvVar`]
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Load and parse an environment variable, using `default` when unset.
///
/// A value that is set but does not parse is an error, never silently
/// replaced by the default.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Load a whole number of seconds as a [`Duration`]
pub fn env_duration_secs(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    env_parse(key, default_secs).map(Duration::from_secs)
}

/// Load a whole number of milliseconds as a [`Duration`]
pub fn env_duration_millis(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    env_parse(key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("SMTP_HOST_TEST", Some("mail.local"), || {
            assert_eq!(env_or_default("SMTP_HOST_TEST", "127.0.0.1"), "mail.local");
        });
        temp_env::with_var_unset("SMTP_HOST_TEST", || {
            assert_eq!(env_or_default("SMTP_HOST_TEST", "127.0.0.1"), "127.0.0.1");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("MISSING_REQUIRED", || {
            let err = env_required("MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_uses_default_when_unset() {
        temp_env::with_var_unset("QUEUE_CAPACITY_TEST", || {
            assert_eq!(env_parse("QUEUE_CAPACITY_TEST", 100usize).unwrap(), 100);
        });
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        temp_env::with_var("QUEUE_CAPACITY_TEST", Some("lots"), || {
            let err = env_parse("QUEUE_CAPACITY_TEST", 100usize).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
            assert!(err.to_string().contains("QUEUE_CAPACITY_TEST"));
        });
    }

    #[test]
    fn test_env_durations() {
        temp_env::with_vars(
            [("TIMEOUT_SECS_TEST", Some("7")), ("DELAY_MS_TEST", Some(" 250 "))],
            || {
                assert_eq!(
                    env_duration_secs("TIMEOUT_SECS_TEST", 10).unwrap(),
                    Duration::from_secs(7)
                );
                assert_eq!(
                    env_duration_millis("DELAY_MS_TEST", 0).unwrap(),
                    Duration::from_millis(250)
                );
            },
        );
    }
}
