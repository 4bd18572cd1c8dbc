//! One video's decode, overlay and encode lifecycle.

use crate::media::{Decoder, EncoderSettings, MediaBackend, MediaError, VideoInfo};
use crate::watermark::{
    calculate_position, is_visible, Anchor, FrameSize, ImageOps, Overlay, WatermarkAsset,
    WatermarkDimensions, WatermarkError, DEFAULT_PADDING,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-file failure.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("No watermark available")]
    MissingWatermark,

    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings applied to every video in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSettings {
    /// Watermark width as a fraction of the frame width.
    pub scale: f64,
    pub anchor: Anchor,
    /// 0.0 is opaque, 1.0 is invisible.
    pub transparency: f32,
    pub padding: u32,
    pub encoder: EncoderSettings,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            scale: 0.1,
            anchor: Anchor::TopRight,
            transparency: 0.5,
            padding: DEFAULT_PADDING,
            encoder: EncoderSettings::default(),
        }
    }
}

impl JobSettings {
    /// Settings from loosely typed inputs. Unknown position names fall back
    /// to top-right.
    pub fn new(scale: f64, position: &str, transparency: f32) -> Self {
        Self {
            scale,
            anchor: Anchor::from_name(position),
            transparency,
            ..Default::default()
        }
    }
}

/// Resize the asset for a frame and pin it at the configured anchor.
pub fn build_overlay(
    asset: &WatermarkAsset,
    frame: FrameSize,
    settings: &JobSettings,
    ops: &dyn ImageOps,
) -> Result<Overlay, JobError> {
    let resized = asset.resized_for(frame.width, settings.scale, ops)?;
    let dims = WatermarkDimensions {
        width: resized.width(),
        height: resized.height(),
    };
    let position = calculate_position(&frame, &dims, settings.anchor, settings.padding);

    if !is_visible(&position, &frame, &dims) {
        tracing::warn!(
            frame_width = frame.width,
            frame_height = frame.height,
            watermark_width = dims.width,
            watermark_height = dims.height,
            x = position.x,
            y = position.y,
            "Watermark lies entirely outside the frame"
        );
    }

    Ok(Overlay::with_transparency(
        resized,
        position,
        settings.transparency,
    ))
}

/// An opened source video with its overlay ready.
///
/// Dropping the job releases the decoder, and any encoder it created, on
/// every exit path.
pub struct CompositeJob {
    source: PathBuf,
    output: PathBuf,
    decoder: Box<dyn Decoder>,
    overlay: Overlay,
}

impl std::fmt::Debug for CompositeJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeJob")
            .field("source", &self.source)
            .field("output", &self.output)
            .field("info", self.decoder.info())
            .field("overlay", &self.overlay)
            .finish()
    }
}

impl CompositeJob {
    /// Open the source and build its overlay.
    pub fn prepare(
        source: &Path,
        output: &Path,
        asset: &WatermarkAsset,
        settings: &JobSettings,
        media: &dyn MediaBackend,
        ops: &dyn ImageOps,
    ) -> Result<Self, JobError> {
        let decoder = media.open(source)?;
        let overlay = build_overlay(asset, decoder.info().frame_size(), settings, ops)?;

        tracing::debug!(
            source = %source.display(),
            width = decoder.info().width,
            height = decoder.info().height,
            overlay = ?overlay,
            "Job prepared"
        );

        Ok(Self {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            decoder,
            overlay,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        self.decoder.info()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Composite every frame and encode the result. Returns the frame count.
    ///
    /// The encoder is only created once the first frame has decoded, so a
    /// source that yields no frames leaves no output file behind.
    pub fn run(
        mut self,
        media: &dyn MediaBackend,
        settings: &EncoderSettings,
    ) -> Result<u64, JobError> {
        let Some(mut frame) = self.decoder.next_frame()? else {
            return Err(MediaError::Decode(format!(
                "{} contains no frames",
                self.source.display()
            ))
            .into());
        };

        let info = self.decoder.info().clone();
        let mut encoder = media.create(&self.output, &self.source, &info, settings)?;
        let mut frames = 0u64;

        loop {
            self.overlay.apply(&mut frame);
            encoder.write_frame(&frame)?;
            frames += 1;

            match self.decoder.next_frame()? {
                Some(next) => frame = next,
                None => break,
            }
        }

        encoder.finish()?;
        Ok(frames)
    }
}
