//! Position calculation for watermark placement.
//!
//! This module maps a named anchor to the top-left pixel where the watermark
//! is drawn on a video frame, and derives the watermark's on-screen size from
//! the frame width.
//!
//! # Anchors
//!
//! - **Corners**: TopLeft, TopRight, BottomLeft, BottomRight (inset by padding)
//! - **Center**: centered on both axes, padding ignored
//!
//! # Example
//!
//! ```
//! use vidmark::watermark::position::{calculate_position, Anchor, FrameSize, WatermarkDimensions};
//!
//! let frame = FrameSize { width: 1920, height: 1080 };
//! let watermark = WatermarkDimensions { width: 192, height: 64 };
//!
//! let pos = calculate_position(&frame, &watermark, Anchor::BottomRight, 10);
//! assert_eq!((pos.x, pos.y), (1718, 1006)); // 1920 - 192 - 10, 1080 - 64 - 10
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default distance between the watermark and the frame edges, in pixels.
pub const DEFAULT_PADDING: u32 = 10;

/// Largest padding honoured. Anything larger already pushes the watermark
/// off any frame, and the bound keeps placement arithmetic within `i32`.
pub const MAX_PADDING: u32 = 1_000_000;

/// Named screen-relative position of the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Anchor {
    /// Every anchor name accepted on the command line and in config files.
    pub const NAMES: [&'static str; 5] = [
        "top-left",
        "top-right",
        "bottom-left",
        "bottom-right",
        "center",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Center => "center",
        }
    }

    /// Resolve an anchor name, falling back to top-right for anything unknown.
    ///
    /// Use `str::parse` when an unknown name should be reported instead.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" => Ok(Self::Center),
            other => Err(format!(
                "unknown position '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Dimensions of the video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left pixel where the watermark is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

impl Placement {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Calculate where the watermark's top-left corner lands on the frame.
///
/// # Arguments
///
/// * `frame` - Dimensions of the video frame
/// * `watermark` - Dimensions of the (already resized) watermark
/// * `anchor` - The configured anchor
/// * `padding` - Distance from the frame edges in pixels
///
/// # Returns
///
/// The (x, y) coordinates of the watermark. Coordinates are not clamped and
/// may be negative when the watermark is larger than the frame. Padding is
/// capped at [`MAX_PADDING`].
pub fn calculate_position(
    frame: &FrameSize,
    watermark: &WatermarkDimensions,
    anchor: Anchor,
    padding: u32,
) -> Placement {
    let frame_w = frame.width as i32;
    let frame_h = frame.height as i32;
    let wm_w = watermark.width as i32;
    let wm_h = watermark.height as i32;
    let p = padding.min(MAX_PADDING) as i32;

    match anchor {
        Anchor::TopLeft => Placement::new(p, p),
        Anchor::TopRight => Placement::new(frame_w - wm_w - p, p),
        Anchor::BottomLeft => Placement::new(p, frame_h - wm_h - p),
        Anchor::BottomRight => Placement::new(frame_w - wm_w - p, frame_h - wm_h - p),
        Anchor::Center => Placement::new(
            (frame_w - wm_w).div_euclid(2),
            (frame_h - wm_h).div_euclid(2),
        ),
    }
}

/// Size of the watermark on a frame of the given width.
///
/// The width is `round(frame_width * scale)`; the height follows the
/// original watermark's aspect ratio. Both are at least one pixel.
pub fn scaled_dimensions(
    original: &WatermarkDimensions,
    frame_width: u32,
    scale: f64,
) -> WatermarkDimensions {
    let width = (frame_width as f64 * scale).round().max(1.0);
    let height = (width * original.height as f64 / original.width.max(1) as f64)
        .round()
        .max(1.0);

    WatermarkDimensions {
        width: width as u32,
        height: height as u32,
    }
}

/// Check if a placement leaves at least part of the watermark on the frame.
pub fn is_visible(pos: &Placement, frame: &FrameSize, watermark: &WatermarkDimensions) -> bool {
    let wm_right = pos.x + watermark.width as i32;
    let wm_bottom = pos.y + watermark.height as i32;

    pos.x < frame.width as i32 && pos.y < frame.height as i32 && wm_right > 0 && wm_bottom > 0
}
