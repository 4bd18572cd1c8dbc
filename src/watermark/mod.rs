//! Watermark module: building the watermark and placing it on video frames.
//!
//! # Pipeline
//!
//! 1. A canonical [`WatermarkAsset`] is built once per batch, from a logo
//!    file or by drawing the default text mark.
//! 2. For each video, the asset is resized so its width is a fraction of the
//!    frame width ([`scaled_dimensions`]), keeping its aspect ratio.
//! 3. [`calculate_position`] maps the configured [`Anchor`] to pixel
//!    coordinates for the resized mark.
//! 4. An [`Overlay`] blends the mark onto every decoded frame at
//!    `1 - transparency` opacity.

pub mod asset;
pub mod compositor;
pub mod error;
pub mod ops;
pub mod position;
pub mod text_renderer;

// Re-export main types for convenience
pub use asset::{AssetSource, WatermarkAsset, DEFAULT_MARK_TEXT};
pub use compositor::Overlay;
pub use error::WatermarkError;
pub use ops::{resize_rgba, ImageOps, RasterOps};
pub use position::{
    calculate_position, is_visible, scaled_dimensions, Anchor, FrameSize, Placement,
    WatermarkDimensions, DEFAULT_PADDING, MAX_PADDING,
};
pub use text_renderer::{Color, TextRenderOptions};
