//! The canonical watermark asset.
//!
//! Built once per batch, either from a logo file or by drawing the default
//! text mark on a small transparent canvas. Each video gets an independent
//! resize of this canonical image, so repeated resizing never compounds.

use super::ops::ImageOps;
use super::position::{scaled_dimensions, WatermarkDimensions};
use super::text_renderer::{Color, TextRenderOptions};
use super::WatermarkError;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Text drawn when no logo is configured.
pub const DEFAULT_MARK_TEXT: &str = "unstabledb";

/// Canvas size of the synthesized text mark.
pub const TEXT_MARK_CANVAS: (u32, u32) = (150, 50);

/// Offset of the text inside the canvas.
pub const TEXT_MARK_ORIGIN: (f32, f32) = (10.0, 10.0);

/// Font size of the text mark in pixels.
pub const TEXT_MARK_FONT_SIZE: f32 = 24.0;

/// Where the asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Logo(PathBuf),
    Text(String),
}

/// Immutable RGBA watermark shared by every job in a batch.
#[derive(Debug, Clone)]
pub struct WatermarkAsset {
    image: RgbaImage,
    source: AssetSource,
}

impl WatermarkAsset {
    /// Load the logo if one is given, otherwise synthesize the text mark.
    pub fn build(logo_path: Option<&Path>, ops: &dyn ImageOps) -> Result<Self, WatermarkError> {
        match logo_path {
            Some(path) => Self::from_logo(path, ops),
            None => Self::text_mark(ops),
        }
    }

    pub fn from_logo(path: &Path, ops: &dyn ImageOps) -> Result<Self, WatermarkError> {
        let image = ops.load(path)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(WatermarkError::DecodeError(format!(
                "{} has no pixels",
                path.display()
            )));
        }

        tracing::info!(
            logo = %path.display(),
            width = image.width(),
            height = image.height(),
            "Watermark loaded"
        );

        Ok(Self {
            image,
            source: AssetSource::Logo(path.to_path_buf()),
        })
    }

    /// Draw the default text on a 150x50 transparent canvas.
    pub fn text_mark(ops: &dyn ImageOps) -> Result<Self, WatermarkError> {
        let (width, height) = TEXT_MARK_CANVAS;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));

        let options = TextRenderOptions {
            text: DEFAULT_MARK_TEXT.to_string(),
            font_size: TEXT_MARK_FONT_SIZE,
            color: Color::translucent_white(),
            origin: TEXT_MARK_ORIGIN,
        };
        ops.draw_text(&mut canvas, &options)?;

        tracing::info!(text = DEFAULT_MARK_TEXT, width, height, "Text watermark created");

        Ok(Self {
            image: canvas,
            source: AssetSource::Text(DEFAULT_MARK_TEXT.to_string()),
        })
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: RgbaImage, source: AssetSource) -> Self {
        Self { image, source }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn dimensions(&self) -> WatermarkDimensions {
        WatermarkDimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Resize a copy of the asset for a frame of the given width.
    pub fn resized_for(
        &self,
        frame_width: u32,
        scale: f64,
        ops: &dyn ImageOps,
    ) -> Result<RgbaImage, WatermarkError> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(WatermarkError::ConfigError(format!(
                "Scale must be positive, got {}",
                scale
            )));
        }
        let target = scaled_dimensions(&self.dimensions(), frame_width, scale);
        ops.resize(&self.image, target.width, target.height)
    }
}
