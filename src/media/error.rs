//! Error types for media probing, decoding and encoding

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} is not available (looked for {path})")]
    ToolNotFound { tool: &'static str, path: PathBuf },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
