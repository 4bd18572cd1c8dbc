//! Text watermark rendering.
//!
//! Draws text onto an RGBA canvas. Used to synthesize the default watermark
//! when no logo is configured.
//!
//! # Font resolution
//!
//! 1. An explicitly configured font file
//! 2. Well-known system fonts (Arial, DejaVu Sans, Liberation Sans, Helvetica)
//! 3. The DejaVu Sans copy embedded in the binary
//!
//! Step 3 cannot fail, so a missing font never blocks watermark creation.

use super::WatermarkError;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Embedded fallback font (DejaVu Sans, Bitstream Vera license).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

/// System font locations probed before falling back to the embedded font.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// RGBA text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// White at roughly half alpha (128/255), the default mark color.
    pub fn translucent_white() -> Self {
        Self::new(255, 255, 255, 128)
    }
}

/// Options for drawing text onto a canvas.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color, alpha included.
    pub color: Color,
    /// Top-left corner of the text box on the canvas.
    pub origin: (f32, f32),
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::translucent_white(),
            origin: (0.0, 0.0),
        }
    }
}

/// Load a font from a file.
pub fn load_font_file(path: &Path) -> Result<FontArc, WatermarkError> {
    let bytes = std::fs::read(path).map_err(|e| {
        WatermarkError::RenderError(format!("Cannot read font {}: {}", path.display(), e))
    })?;
    FontArc::try_from_vec(bytes).map_err(|e| {
        WatermarkError::RenderError(format!("Invalid font {}: {}", path.display(), e))
    })
}

/// The font compiled into the binary.
pub fn embedded_font() -> Result<FontArc, WatermarkError> {
    FontArc::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| WatermarkError::RenderError(format!("Embedded font is invalid: {}", e)))
}

/// Resolve the font used for the text mark.
///
/// A configured font that cannot be loaded is logged and skipped.
pub fn resolve_font(preferred: Option<&Path>) -> Result<FontArc, WatermarkError> {
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        match load_font_file(&candidate) {
            Ok(font) => {
                tracing::debug!(font = %candidate.display(), "Using font");
                return Ok(font);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping unusable font"),
        }
    }

    tracing::debug!("No system font found, using embedded font");
    embedded_font()
}

/// Draw text onto an existing canvas.
///
/// Glyphs falling outside the canvas are clipped.
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontArc,
    options: &TextRenderOptions,
) -> Result<(), WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);
    let (canvas_width, canvas_height) = canvas.dimensions();

    let (origin_x, origin_y) = options.origin;
    let baseline_y = origin_y + scaled_font.ascent();

    let mut cursor_x = origin_x;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in options.text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && x < canvas_width as i32 && y < canvas_height as i32 {
                    let pixel_alpha = (coverage * options.color.a as f32).round() as u8;
                    let pixel = Rgba([
                        options.color.r,
                        options.color.g,
                        options.color.b,
                        pixel_alpha,
                    ]);

                    let existing = canvas.get_pixel(x as u32, y as u32);
                    let blended = blend_pixels(*existing, pixel);
                    canvas.put_pixel(x as u32, y as u32, blended);
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(())
}

/// Blend two RGBA pixels using alpha compositing.
fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        // Keep the canvas color so fully transparent areas stay untouched
        return bottom;
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
