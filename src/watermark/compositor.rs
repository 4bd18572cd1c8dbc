//! Overlay compositing onto decoded video frames.
//!
//! An [`Overlay`] is a resized watermark pinned at a fixed placement with a
//! fixed opacity. It is blended onto every frame of a video, which keeps it
//! visible for the video's entire duration.
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use vidmark::watermark::compositor::Overlay;
//! use vidmark::watermark::position::Placement;
//!
//! let mark = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
//! let overlay = Overlay::new(mark, Placement::new(2, 2), 0.5);
//!
//! let mut frame = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
//! overlay.apply(&mut frame);
//! assert!(frame.get_pixel(3, 3)[0] > 100);
//! assert_eq!(frame.get_pixel(10, 10)[0], 0);
//! ```

use super::position::{FrameSize, Placement, WatermarkDimensions};
use image::{Rgba, RgbaImage};

/// A watermark pinned to a frame position.
#[derive(Clone)]
pub struct Overlay {
    /// The resized watermark image (RGBA).
    image: RgbaImage,
    /// Top-left corner on the frame. May be negative.
    position: Placement,
    /// Opacity multiplied into the watermark's own alpha (0.0 to 1.0).
    opacity: f32,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

impl Overlay {
    pub fn new(image: RgbaImage, position: Placement, opacity: f32) -> Self {
        Self {
            image,
            position,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Build an overlay from a transparency value (1.0 = invisible).
    pub fn with_transparency(image: RgbaImage, position: Placement, transparency: f32) -> Self {
        Self::new(image, position, 1.0 - transparency)
    }

    pub fn position(&self) -> Placement {
        self.position
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> WatermarkDimensions {
        WatermarkDimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Frame pixels covered by the overlay, as `(x_start, y_start, x_end, y_end)`
    /// with exclusive ends. `None` when nothing lands on the frame.
    pub fn visible_region(&self, frame: &FrameSize) -> Option<(u32, u32, u32, u32)> {
        let x_start = self.position.x.max(0);
        let y_start = self.position.y.max(0);
        let x_end = (self.position.x + self.image.width() as i32).min(frame.width as i32);
        let y_end = (self.position.y + self.image.height() as i32).min(frame.height as i32);

        if x_start >= x_end || y_start >= y_end {
            return None;
        }

        Some((
            x_start as u32,
            y_start as u32,
            x_end as u32,
            y_end as u32,
        ))
    }

    /// Blend the overlay onto a frame in place.
    ///
    /// Parts of the overlay outside the frame are clipped.
    pub fn apply(&self, frame: &mut RgbaImage) {
        if self.opacity <= 0.0 {
            return;
        }

        let frame_size = FrameSize {
            width: frame.width(),
            height: frame.height(),
        };
        let Some((x_start, y_start, x_end, y_end)) = self.visible_region(&frame_size) else {
            return;
        };

        for ty in y_start..y_end {
            for tx in x_start..x_end {
                let wx = (tx as i32 - self.position.x) as u32;
                let wy = (ty as i32 - self.position.y) as u32;

                let wm_pixel = self.image.get_pixel(wx, wy);
                if wm_pixel[3] == 0 {
                    continue;
                }

                let frame_pixel = frame.get_pixel(tx, ty);
                let blended = blend_pixels(*frame_pixel, *wm_pixel, self.opacity);
                frame.put_pixel(tx, ty, blended);
            }
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if fg_alpha <= 0.0 {
        return background;
    }
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
