//! Compositing and PNG export.
//!
//! Rendering always starts from scratch: the surface is cleared, the base
//! image is copied in, and the watermark is stamped on top. Nothing is
//! patched incrementally, so rendering the same inputs twice produces the
//! same pixels.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::placement::compute_placements;
use crate::source::{RasterImage, SizePx};
use crate::text::{FontBook, TextStyle, composite_over, render_text_layer};
use crate::watermark::WatermarkSpec;

/// Suggested file name for exported images.
pub const EXPORT_FILE_NAME: &str = "watermarked-image.png";

/// Errors raised while exporting a surface.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot export an empty {width}x{height} image")]
    Empty { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

// ============================================================================
// Surface
// ============================================================================

/// The pixel buffer a render composites into.
///
/// Always sized to the image it was last rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Creates a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.pixels.width(), self.pixels.height())
    }

    /// Consumes the surface and returns its pixel data.
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// Resizes to `width` x `height` and clears to transparent.
    ///
    /// The buffer is only reallocated when the size changes.
    fn reset(&mut self, width: u32, height: u32) {
        if self.pixels.dimensions() == (width, height) {
            self.pixels.fill(0);
        } else {
            self.pixels = RgbaImage::new(width, height);
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders `image` with the watermark described by `spec` onto a new surface.
pub fn render(image: &RasterImage, spec: &WatermarkSpec, fonts: &FontBook) -> Surface {
    let mut surface = Surface::new(image.width(), image.height());
    render_into(&mut surface, image, spec, fonts);
    surface
}

/// Renders into an existing surface, resizing it to match `image`.
#[tracing::instrument(level = "debug", skip_all, fields(width = image.width(), height = image.height()))]
pub fn render_into(surface: &mut Surface, image: &RasterImage, spec: &WatermarkSpec, fonts: &FontBook) {
    surface.reset(image.width(), image.height());
    imageops::replace(&mut surface.pixels, image.pixels(), 0, 0);

    if !spec.has_text() {
        return;
    }
    stamp_watermark(&mut surface.pixels, spec, fonts);
}

fn stamp_watermark(pixels: &mut RgbaImage, spec: &WatermarkSpec, fonts: &FontBook) {
    let (width, height) = pixels.dimensions();
    let style = TextStyle {
        font_size: spec.font_size() as f32,
        color: spec.fill(),
        opacity: spec.alpha(),
    };

    let metrics = fonts.measure(&spec.text, style.font_size);
    let placements = compute_placements(
        width as f32,
        height as f32,
        metrics,
        spec.orientation,
        spec.tiled,
    );
    debug!(
        text_width = metrics.width,
        placements = placements.len(),
        orientation = ?spec.orientation,
        tiled = spec.tiled,
        "computed watermark placements"
    );

    let offset = spec.orientation.text_offset(metrics);
    let transforms: Vec<_> = placements
        .iter()
        .map(|p| p.transform(offset))
        .collect();

    if let Some(layer) = render_text_layer(fonts, width, height, &spec.text, &style, &transforms) {
        composite_over(pixels, &layer, 0, 0);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Encodes the surface as a PNG.
///
/// A surface with no pixels has nothing to encode and is rejected.
pub fn serialize(surface: &Surface) -> Result<Vec<u8>, ExportError> {
    let (width, height) = surface.pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Empty { width, height });
    }

    let mut out = Vec::new();
    surface
        .pixels
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    debug!(bytes = out.len(), "encoded PNG");
    Ok(out)
}
