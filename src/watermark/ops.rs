//! Image capability used by the watermark pipeline.
//!
//! Loading, resizing and text drawing sit behind [`ImageOps`] so the
//! geometry and compositing code can be exercised with in-memory images.

use super::text_renderer::{draw_text, resolve_font, TextRenderOptions};
use super::WatermarkError;
use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::RgbaImage;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Image load / resize / draw operations.
pub trait ImageOps {
    /// Load an image file as RGBA, adding an opaque alpha channel if the
    /// source has none.
    fn load(&self, path: &Path) -> Result<RgbaImage, WatermarkError>;

    /// Resize to exactly `width` x `height`.
    fn resize(&self, image: &RgbaImage, width: u32, height: u32)
        -> Result<RgbaImage, WatermarkError>;

    /// Draw text onto the canvas.
    fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        options: &TextRenderOptions,
    ) -> Result<(), WatermarkError>;
}

/// [`ImageOps`] backed by the `image`, `fast_image_resize` and `ab_glyph` crates.
#[derive(Debug, Clone, Default)]
pub struct RasterOps {
    font_path: Option<PathBuf>,
}

impl RasterOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer the given font file for text rendering.
    pub fn with_font(font_path: Option<PathBuf>) -> Self {
        Self { font_path }
    }
}

impl ImageOps for RasterOps {
    fn load(&self, path: &Path) -> Result<RgbaImage, WatermarkError> {
        let reader = image::io::Reader::open(path)
            .map_err(|e| WatermarkError::LoadError(format!("{}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| WatermarkError::LoadError(format!("{}: {}", path.display(), e)))?;

        let decoded = reader
            .decode()
            .map_err(|e| WatermarkError::DecodeError(format!("{}: {}", path.display(), e)))?;

        Ok(decoded.to_rgba8())
    }

    fn resize(
        &self,
        image: &RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, WatermarkError> {
        resize_rgba(image, width, height)
    }

    fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        options: &TextRenderOptions,
    ) -> Result<(), WatermarkError> {
        let font = resolve_font(self.font_path.as_deref())?;
        draw_text(canvas, &font, options)
    }
}

/// Resize an RGBA image with a Lanczos3 filter.
///
/// Alpha is premultiplied around the convolution so transparent pixels do
/// not bleed their color into visible edges.
pub fn resize_rgba(
    image: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, WatermarkError> {
    let src_width = NonZeroU32::new(image.width())
        .ok_or_else(|| WatermarkError::ResizeError("Source width is 0".to_string()))?;
    let src_height = NonZeroU32::new(image.height())
        .ok_or_else(|| WatermarkError::ResizeError("Source height is 0".to_string()))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| WatermarkError::ResizeError("Target width is 0".to_string()))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| WatermarkError::ResizeError("Target height is 0".to_string()))?;

    if image.dimensions() == (target_w, target_h) {
        return Ok(image.clone());
    }

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| WatermarkError::ResizeError(format!("Failed to create source image: {:?}", e)))?;

    let alpha_mul_div = MulDiv::default();
    alpha_mul_div
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| WatermarkError::ResizeError(format!("Alpha premultiply failed: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| WatermarkError::ResizeError(format!("Resize operation failed: {:?}", e)))?;

    alpha_mul_div
        .divide_alpha_inplace(&mut dst_image.view_mut())
        .map_err(|e| WatermarkError::ResizeError(format!("Alpha unpremultiply failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| WatermarkError::ResizeError("Failed to create output image buffer".to_string()))
}
