//! Video decoding and encoding.
//!
//! The compositing pipeline only sees the [`MediaBackend`], [`Decoder`] and
//! [`Encoder`] traits. [`FfmpegBackend`] implements them by piping raw RGBA
//! frames through `ffmpeg` child processes.

pub mod error;
pub mod ffmpeg;
pub mod probe;
pub mod tools;

pub use error::MediaError;
pub use ffmpeg::FfmpegBackend;

use crate::watermark::FrameSize;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frame rate as a rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Properties of a source video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub frame_rate: FrameRate,
    pub has_audio: bool,
}

impl VideoInfo {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Bytes in one RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_threads() -> u32 {
    4
}

/// Codec choice and thread bound for the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            threads: default_threads(),
        }
    }
}

/// Opens decoders and creates encoders.
pub trait MediaBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>, MediaError>;

    /// Create an encoder writing to `output`. Audio, when present, is taken
    /// from `source`.
    fn create(
        &self,
        output: &Path,
        source: &Path,
        info: &VideoInfo,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn Encoder>, MediaError>;
}

/// A stream of decoded frames.
pub trait Decoder {
    fn info(&self) -> &VideoInfo;

    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbaImage>, MediaError>;
}

/// A sink for composited frames.
pub trait Encoder {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), MediaError>;

    /// Flush and close the output file.
    fn finish(self: Box<Self>) -> Result<(), MediaError>;
}
