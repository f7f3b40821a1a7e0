//! Interactive watermarking session.

use std::path::Path;

use tracing::{debug, info};

use crate::compositor::{ExportError, Surface, render_into, serialize};
use crate::source::{self, ImageLoadError, RasterImage};
use crate::text::FontBook;
use crate::watermark::WatermarkSpec;

// ============================================================================
// WatermarkSession
// ============================================================================

/// Holds the current image, the current settings and the rendered preview.
///
/// Every input change re-renders immediately, so [`surface`](Self::surface)
/// always reflects the latest image and settings. Without an image there is
/// no surface and nothing to export.
///
/// # Example
///
/// ```
/// use stamp_renderer::{FontBook, Orientation, WatermarkSession, WatermarkSpec};
///
/// let mut session = WatermarkSession::new(FontBook::system());
/// assert!(!session.can_export());
///
/// # let png = {
/// #     let img = image::RgbaImage::from_pixel(64, 48, image::Rgba([255, 255, 255, 255]));
/// #     let mut out = Vec::new();
/// #     img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
/// #     out
/// # };
/// session.load_image(&png, Some("image/png")).unwrap();
/// session.update_spec(|spec| {
///     spec.orientation = Orientation::DiagonalTlbr;
///     spec.tiled = true;
/// });
///
/// let bytes = session.export_png().unwrap().unwrap();
/// assert!(bytes.starts_with(b"\x89PNG"));
/// ```
pub struct WatermarkSession {
    fonts: FontBook,
    spec: WatermarkSpec,
    image: Option<RasterImage>,
    surface: Option<Surface>,
}

impl WatermarkSession {
    /// Creates a session with default settings and no image.
    pub fn new(fonts: FontBook) -> Self {
        Self::with_spec(fonts, WatermarkSpec::default())
    }

    /// Creates a session with the given settings and no image.
    pub fn with_spec(fonts: FontBook, spec: WatermarkSpec) -> Self {
        Self {
            fonts,
            spec,
            image: None,
            surface: None,
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Returns the current settings.
    pub fn spec(&self) -> &WatermarkSpec {
        &self.spec
    }

    /// Returns the loaded image, if any.
    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    /// Returns the rendered preview, if an image is loaded.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Decodes and installs a new image, then re-renders.
    ///
    /// On failure the previous image and preview are kept.
    #[tracing::instrument(level = "debug", skip(self, bytes), fields(len = bytes.len()))]
    pub fn load_image(&mut self, bytes: &[u8], mime_hint: Option<&str>) -> Result<(), ImageLoadError> {
        let image = source::load(bytes, mime_hint)?;
        self.set_image(image);
        Ok(())
    }

    /// Reads, decodes and installs an image file, then re-renders.
    ///
    /// On failure the previous image and preview are kept.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), ImageLoadError> {
        let image = source::load_file(path)?;
        self.set_image(image);
        Ok(())
    }

    /// Installs an already-decoded image, then re-renders.
    pub fn set_image(&mut self, image: RasterImage) {
        info!(width = image.width(), height = image.height(), "image loaded");
        self.image = Some(image);
        self.render();
    }

    /// Drops the current image and preview.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.surface = None;
    }

    /// Replaces the settings, then re-renders.
    pub fn set_spec(&mut self, spec: WatermarkSpec) {
        self.spec = spec;
        self.render();
    }

    /// Edits the settings in place, then re-renders.
    pub fn update_spec(&mut self, edit: impl FnOnce(&mut WatermarkSpec)) {
        edit(&mut self.spec);
        self.render();
    }

    /// Renders the current image and settings into the preview surface.
    ///
    /// Does nothing when no image is loaded.
    pub fn render(&mut self) -> Option<&Surface> {
        let image = self.image.as_ref()?;
        let surface = self
            .surface
            .get_or_insert_with(|| Surface::new(image.width(), image.height()));
        render_into(surface, image, &self.spec, &self.fonts);
        debug!(text = %self.spec.text, "preview rendered");
        self.surface.as_ref()
    }

    /// Returns true when there is a preview to export.
    pub fn can_export(&self) -> bool {
        self.surface.is_some()
    }

    /// Encodes the preview as PNG.
    ///
    /// Returns `None` when no image is loaded.
    pub fn export_png(&self) -> Option<Result<Vec<u8>, ExportError>> {
        self.surface.as_ref().map(serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Orientation;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn new_session_has_defaults_and_nothing_to_export() {
        let session = WatermarkSession::new(FontBook::empty());
        assert_eq!(session.spec(), &WatermarkSpec::default());
        assert!(session.image().is_none());
        assert!(session.surface().is_none());
        assert!(!session.can_export());
        assert!(session.export_png().is_none());
    }

    #[test]
    fn render_without_image_is_noop() {
        let mut session = WatermarkSession::new(FontBook::empty());
        assert!(session.render().is_none());
        session.set_spec(WatermarkSpec::new("x").with_tiled(true));
        assert!(session.surface().is_none());
    }

    #[test]
    fn loading_renders_surface_of_image_size() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.load_image(&png(30, 20, [9, 9, 9, 255]), Some("image/png")).unwrap();

        let surface = session.surface().unwrap();
        assert_eq!(surface.width(), 30);
        assert_eq!(surface.height(), 20);
        assert!(session.can_export());
    }

    #[test]
    fn surface_follows_new_image_dimensions() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.load_image(&png(30, 20, [0, 0, 0, 255]), None).unwrap();
        session.load_image(&png(7, 11, [255, 0, 0, 255]), None).unwrap();

        let surface = session.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (7, 11));
        assert_eq!(surface.pixels().get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn failed_load_keeps_previous_image() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.load_image(&png(8, 8, [1, 2, 3, 255]), None).unwrap();
        let before = session.surface().unwrap().clone();

        let err = session.load_image(b"not an image", Some("text/plain")).unwrap_err();
        assert!(matches!(err, ImageLoadError::NotAnImage));

        let err = session
            .load_image(&vec![0u8; 15 * 1024 * 1024], Some("image/jpeg"))
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::TooLarge { .. }));

        assert_eq!(session.image().unwrap().width(), 8);
        assert_eq!(session.surface().unwrap(), &before);
    }

    #[test]
    fn spec_changes_are_applied() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.update_spec(|spec| {
            spec.orientation = Orientation::Vertical;
            spec.tiled = true;
        });
        assert_eq!(session.spec().orientation, Orientation::Vertical);
        assert!(session.spec().tiled);

        session.set_spec(WatermarkSpec::new("DRAFT"));
        assert_eq!(session.spec().text, "DRAFT");
        assert!(!session.spec().tiled);
    }

    #[test]
    fn clear_image_disables_export() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.load_image(&png(4, 4, [0, 0, 0, 255]), None).unwrap();
        assert!(session.can_export());

        session.clear_image();
        assert!(!session.can_export());
        assert!(session.export_png().is_none());
    }

    #[test]
    fn export_round_trips_dimensions() {
        let mut session = WatermarkSession::new(FontBook::empty());
        session.load_image(&png(21, 13, [50, 60, 70, 255]), None).unwrap();

        let bytes = session.export_png().unwrap().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (21, 13));
    }
}
