//! Watermark error types.
//!
//! Defines errors that can occur while building or resizing the watermark
//! asset.

use std::fmt;

/// Errors that can occur during watermark processing.
#[derive(Debug)]
pub enum WatermarkError {
    /// Failed to read the watermark image from disk
    LoadError(String),

    /// Failed to decode watermark image
    DecodeError(String),

    /// Failed to render text watermark
    RenderError(String),

    /// Failed to resize the watermark for a frame
    ResizeError(String),

    /// Invalid configuration
    ConfigError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadError(msg) => write!(f, "Failed to load watermark: {}", msg),
            Self::DecodeError(msg) => write!(f, "Failed to decode watermark image: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::ResizeError(msg) => write!(f, "Failed to resize watermark: {}", msg),
            Self::ConfigError(msg) => write!(f, "Watermark configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
