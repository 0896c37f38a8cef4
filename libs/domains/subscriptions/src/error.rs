use email::MailError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Manual generation failed: {0}")]
    Generation(String),

    #[error("Manual generation exceeded its {0:?} deadline")]
    GenerationTimeout(Duration),

    #[error("Cannot read manual source {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write artifact {path}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Mail(#[from] MailError),
}

pub type FulfillmentResult<T> = Result<T, FulfillmentError>;
