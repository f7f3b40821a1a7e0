//! Image ingestion.
//!
//! This module turns user-supplied bytes into a [`RasterImage`], rejecting
//! non-image and oversized input before any decoding is attempted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::debug;

/// Largest accepted input, in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Bytes read from the start of a file to sniff its format.
const SNIFF_BYTES: usize = 32;

// ============================================================================
// ImageLoadError
// ============================================================================

/// Reasons an image could not be loaded.
///
/// The messages are meant to be shown inline to the user. None of them is
/// fatal: a failed load leaves any previously loaded image in place.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    /// The input is not a raster image.
    #[error("please upload an image file (JPEG, PNG, WebP)")]
    NotAnImage,

    /// The input exceeds [`MAX_IMAGE_BYTES`].
    #[error("file size must be less than 10MB (got {size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    /// The input looked like an image but could not be decoded.
    #[error("failed to load image: {0}")]
    DecodeFailed(#[source] image::ImageError),

    /// The input could not be read from disk.
    #[error("failed to read file: {0}")]
    ReadFailed(#[source] std::io::Error),
}

// ============================================================================
// SizePx
// ============================================================================

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// ============================================================================
// RasterImage
// ============================================================================

/// A decoded image ready for compositing.
///
/// The pixel data is never modified after construction; rendering copies
/// it onto a separate [`Surface`](crate::Surface).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    data: RgbaImage,
}

impl RasterImage {
    /// Wraps an already-decoded RGBA buffer.
    pub fn from_rgba(data: RgbaImage) -> Self {
        Self { data }
    }

    /// Returns the pixel data.
    pub fn pixels(&self) -> &RgbaImage {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    /// Returns the pixel dimensions of the image.
    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.data.width(), self.data.height())
    }

    /// Consumes the image and returns its pixel data.
    pub fn into_pixels(self) -> RgbaImage {
        self.data
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Decodes raw image bytes.
///
/// `mime_hint` is the MIME type reported by whatever delivered the bytes
/// (a file picker, a drop event, an HTTP header). When present it must be
/// an `image/*` type; when absent the format is sniffed from the content.
///
/// The type is checked first, then the size, both before decoding, so
/// rejected input never reaches the decoder.
pub fn load(bytes: &[u8], mime_hint: Option<&str>) -> Result<RasterImage, ImageLoadError> {
    check_type(bytes, mime_hint)?;
    check_size(bytes.len() as u64)?;

    let data = image::load_from_memory(bytes)
        .map_err(ImageLoadError::DecodeFailed)?
        .to_rgba8();

    debug!(width = data.width(), height = data.height(), "decoded image");
    Ok(RasterImage::from_rgba(data))
}

/// Reads and decodes an image file.
///
/// The MIME hint is derived from the file extension when it names a known
/// image format; otherwise only the file header is read for sniffing. The
/// size limit is checked against the file metadata, so oversized files are
/// rejected without being read.
pub fn load_file(path: impl AsRef<Path>) -> Result<RasterImage, ImageLoadError> {
    let path = path.as_ref();
    let hint = ImageFormat::from_path(path).ok().map(|f| f.to_mime_type());
    if hint.is_none() {
        check_type(&read_header(path)?, None)?;
    }

    let meta = std::fs::metadata(path).map_err(ImageLoadError::ReadFailed)?;
    check_size(meta.len())?;

    let bytes = std::fs::read(path).map_err(ImageLoadError::ReadFailed)?;
    load(&bytes, hint)
}

fn read_header(path: &Path) -> Result<Vec<u8>, ImageLoadError> {
    let file = File::open(path).map_err(ImageLoadError::ReadFailed)?;
    let mut header = Vec::with_capacity(SNIFF_BYTES);
    file.take(SNIFF_BYTES as u64)
        .read_to_end(&mut header)
        .map_err(ImageLoadError::ReadFailed)?;
    Ok(header)
}

fn check_type(bytes: &[u8], mime_hint: Option<&str>) -> Result<(), ImageLoadError> {
    match mime_hint {
        Some(mime) if is_image_mime(mime) => Ok(()),
        Some(_) => Err(ImageLoadError::NotAnImage),
        None => image::guess_format(bytes)
            .map(|_| ())
            .map_err(|_| ImageLoadError::NotAnImage),
    }
}

fn check_size(size: u64) -> Result<(), ImageLoadError> {
    let limit = MAX_IMAGE_BYTES as u64;
    if size > limit {
        return Err(ImageLoadError::TooLarge { size, limit });
    }
    Ok(())
}

fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}
