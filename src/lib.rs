//! stamp-renderer: text watermarks for raster images
//!
//! This crate loads an image, stamps a configurable text watermark on it
//! (once in the centre, or tiled across the whole image, in one of four
//! orientations) and exports the result as PNG.
//!
//! # Example
//!
//! ```
//! use stamp_renderer::{FontBook, Orientation, RasterImage, WatermarkSpec};
//!
//! let image = RasterImage::from_rgba(image::RgbaImage::new(320, 240));
//! let spec = WatermarkSpec::new("CONFIDENTIAL")
//!     .with_opacity(0.3)
//!     .with_orientation(Orientation::DiagonalBltr)
//!     .with_tiled(true);
//!
//! let surface = stamp_renderer::render(&image, &spec, &FontBook::system());
//! let png = stamp_renderer::serialize(&surface).unwrap();
//! ```
//!
//! # Placement only
//!
//! The placement geometry is available on its own, without any pixels:
//!
//! ```
//! use stamp_renderer::{compute_placements, Orientation, TextMetrics};
//!
//! let metrics = TextMetrics::new(180.0, 32.0);
//! let placements = compute_placements(800.0, 600.0, metrics, Orientation::Horizontal, false);
//! assert_eq!((placements[0].x, placements[0].y), (310.0, 316.0));
//! ```
//!
//! # Interactive use
//!
//! [`WatermarkSession`] keeps the current image and settings together and
//! re-renders the preview whenever either changes.

mod compositor;
mod placement;
mod session;
mod source;
mod text;
mod watermark;

#[cfg(feature = "canvas")]
mod canvas;

pub use compositor::{EXPORT_FILE_NAME, ExportError, Surface, render, render_into, serialize};
pub use placement::{Orientation, Placement, TextMetrics, compute_placements};
pub use session::WatermarkSession;
pub use source::{ImageLoadError, MAX_IMAGE_BYTES, RasterImage, SizePx, load, load_file};
pub use text::{FontBook, TextStyle, composite_over, parse_hex_color};
pub use watermark::{
    COLOR_SWATCHES, DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_TEXT, MAX_FONT_SIZE,
    MIN_FONT_SIZE, WatermarkSpec,
};

#[cfg(feature = "canvas")]
pub use canvas::CanvasRenderer;
