//! HTML Canvas rendering for WASM environments.
//!
//! This module provides [`CanvasRenderer`], a wrapper around
//! [`WatermarkSession`] that draws the live preview straight into an HTML
//! canvas element and hands the exported PNG back to JavaScript.
//!
//! # Feature Flag
//!
//! This module is only available with the `canvas` feature enabled:
//!
//! ```toml
//! [dependencies]
//! stamp-renderer = { version = "0.1", features = ["canvas"] }
//! ```
//!
//! # Example (JavaScript/TypeScript)
//!
//! ```javascript
//! import init, { CanvasRenderer } from 'stamp-renderer';
//!
//! await init();
//!
//! // Browsers have no system fonts to offer, so pass one in.
//! const renderer = new CanvasRenderer(fontBytes);
//!
//! renderer.loadImage(fileBytes, file.type);
//! renderer.setOrientation('diagonal-tl-br');
//! renderer.setLoop(true);
//! renderer.renderToCanvas(document.getElementById('preview'));
//!
//! const png = renderer.exportPng(); // Uint8Array, or undefined without an image
//! ```

use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::compositor::EXPORT_FILE_NAME;
use crate::placement::Orientation;
use crate::session::WatermarkSession;
use crate::text::FontBook;
use crate::watermark::WatermarkSpec;

// ============================================================================
// CanvasRenderer
// ============================================================================

/// A wrapper around [`WatermarkSession`] for rendering to HTML canvas elements.
#[wasm_bindgen]
pub struct CanvasRenderer {
    session: WatermarkSession,
}

#[wasm_bindgen]
impl CanvasRenderer {
    /// Creates a renderer that draws text with the given font file.
    #[wasm_bindgen(constructor)]
    pub fn new(font_data: &[u8]) -> CanvasRenderer {
        Self {
            session: WatermarkSession::new(FontBook::from_bytes(font_data.to_vec())),
        }
    }

    // ---- Image ----

    /// Loads an image from raw file bytes.
    ///
    /// `mime_type` is the `File.type` reported by the browser; pass an empty
    /// string to sniff the format instead. The error message is suitable for
    /// showing next to the upload control.
    #[wasm_bindgen(js_name = "loadImage")]
    pub fn load_image(&mut self, bytes: &[u8], mime_type: &str) -> Result<(), JsError> {
        let hint = (!mime_type.is_empty()).then_some(mime_type);
        self.session
            .load_image(bytes, hint)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Returns true once an image is loaded.
    #[wasm_bindgen(js_name = "hasImage")]
    pub fn has_image(&self) -> bool {
        self.session.can_export()
    }

    // ---- Settings ----

    #[wasm_bindgen(js_name = "setText")]
    pub fn set_text(&mut self, text: String) {
        self.session.update_spec(|spec| spec.text = text);
    }

    /// Sets the font size in pixels (clamped to 12-72).
    #[wasm_bindgen(js_name = "setFontSize")]
    pub fn set_font_size(&mut self, px: u32) {
        self.session.update_spec(|spec| *spec = spec.clone().with_font_size(px));
    }

    /// Sets the opacity (clamped to 0.0-1.0).
    #[wasm_bindgen(js_name = "setOpacity")]
    pub fn set_opacity(&mut self, opacity: f32) {
        self.session.update_spec(|spec| *spec = spec.clone().with_opacity(opacity));
    }

    /// Sets the fill colour as a `#rrggbb` string.
    #[wasm_bindgen(js_name = "setColor")]
    pub fn set_color(&mut self, color: String) {
        self.session.update_spec(|spec| spec.color = color);
    }

    /// Sets the orientation: "horizontal", "vertical", "diagonal-tl-br" or
    /// "diagonal-bl-tr". Unknown values fall back to horizontal.
    #[wasm_bindgen(js_name = "setOrientation")]
    pub fn set_orientation(&mut self, orientation: &str) {
        let orientation = match orientation {
            "vertical" => Orientation::Vertical,
            "diagonal-tl-br" => Orientation::DiagonalTlbr,
            "diagonal-bl-tr" => Orientation::DiagonalBltr,
            _ => Orientation::Horizontal,
        };
        self.session.update_spec(|spec| spec.orientation = orientation);
    }

    #[wasm_bindgen(js_name = "setLoop")]
    pub fn set_loop(&mut self, tiled: bool) {
        self.session.update_spec(|spec| spec.tiled = tiled);
    }

    // ---- Rendering ----

    /// Draws the current preview into a canvas, resizing it to the image.
    ///
    /// Does nothing when no image is loaded.
    #[wasm_bindgen(js_name = "renderToCanvas")]
    pub fn render_to_canvas(&self, canvas: &HtmlCanvasElement) -> Result<(), JsError> {
        let Some(surface) = self.session.surface() else {
            return Ok(());
        };

        let width = surface.width();
        let height = surface.height();
        canvas.set_width(width);
        canvas.set_height(height);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|_| JsError::new("Failed to get 2d context"))?
            .ok_or_else(|| JsError::new("Canvas 2d context is null"))?
            .dyn_into()
            .map_err(|_| JsError::new("Failed to cast to CanvasRenderingContext2d"))?;

        let image_data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(surface.pixels().as_raw().as_slice()),
            width,
            height,
        )
        .map_err(|_| JsError::new("Failed to create ImageData"))?;

        ctx.put_image_data(&image_data, 0.0, 0.0)
            .map_err(|_| JsError::new("Failed to put image data"))?;

        Ok(())
    }

    /// Returns the preview encoded as PNG, or `undefined` without an image.
    #[wasm_bindgen(js_name = "exportPng")]
    pub fn export_png(&self) -> Result<Option<js_sys::Uint8Array>, JsError> {
        let Some(result) = self.session.export_png() else {
            return Ok(None);
        };
        let bytes = result.map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Some(js_sys::Uint8Array::from(bytes.as_slice())))
    }

    /// Suggested download name for the exported file.
    #[wasm_bindgen(js_name = "exportFileName")]
    pub fn export_file_name() -> String {
        EXPORT_FILE_NAME.to_string()
    }

    // ---- Settings Import/Export ----

    /// Exports the current settings as a JSON string.
    #[wasm_bindgen(js_name = "exportSettingsJson")]
    pub fn export_settings_json(&self) -> Result<String, JsError> {
        self.session
            .spec()
            .to_json()
            .map_err(|e| JsError::new(&format!("Failed to serialize settings: {}", e)))
    }

    /// Replaces all settings from a JSON string.
    #[wasm_bindgen(js_name = "importSettingsJson")]
    pub fn import_settings_json(&mut self, json: &str) -> Result<(), JsError> {
        let spec = WatermarkSpec::from_json(json)
            .map_err(|e| JsError::new(&format!("Failed to parse settings: {}", e)))?;
        self.session.set_spec(spec);
        Ok(())
    }
}
