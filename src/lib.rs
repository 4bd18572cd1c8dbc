// vidmark: batch video watermarking

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod media;
pub mod watermark;
pub mod watermarker;

pub use error::VidmarkError;
pub use watermarker::{BatchReport, FileOutcome, Watermarker};
