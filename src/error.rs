// Error types module

use thiserror::Error;

/// Errors that stop a batch before any video is processed.
///
/// Per-video failures are [`crate::job::JobError`] and never end the batch.
#[derive(Error, Debug)]
pub enum VidmarkError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
