use core_config::{ConfigError, FromEnv, env_duration_millis, env_duration_secs, env_or_default};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the fulfillment side of the pipeline.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Where generated manuals are written before being mailed
    pub tmp_dir: PathBuf,
    /// Text document each manual is rendered from
    pub manual_source_path: PathBuf,
    /// Deadline for a single manual render
    pub generation_timeout: Duration,
    /// Artificial latency added to each render, standing in for an external renderer
    pub render_delay: Duration,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from("./tmp"),
            manual_source_path: PathBuf::from("./assets/manual.txt"),
            generation_timeout: Duration::from_secs(30),
            render_delay: Duration::ZERO,
        }
    }
}

impl FromEnv for FulfillmentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tmp_dir: PathBuf::from(env_or_default("FULFILLMENT_TMP_DIR", "./tmp")),
            manual_source_path: PathBuf::from(env_or_default(
                "MANUAL_SOURCE_PATH",
                "./assets/manual.txt",
            )),
            generation_timeout: env_duration_secs("MANUAL_GENERATION_TIMEOUT_SECS", 30)?,
            render_delay: env_duration_millis("MANUAL_RENDER_DELAY_MS", 0)?,
        })
    }
}
