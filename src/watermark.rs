//! User-adjustable watermark settings.
//!
//! A [`WatermarkSpec`] captures everything the user can change about the
//! overlay. It serializes to camelCase JSON so a frontend can hand settings
//! across a process or wasm boundary.
//!
//! # Example
//!
//! ```
//! use stamp_renderer::{Orientation, WatermarkSpec};
//!
//! let spec = WatermarkSpec::new("CONFIDENTIAL")
//!     .with_font_size(48)
//!     .with_opacity(0.3)
//!     .with_orientation(Orientation::DiagonalBltr)
//!     .with_tiled(true);
//!
//! let json = spec.to_json().unwrap();
//! let restored = WatermarkSpec::from_json(&json).unwrap();
//! assert_eq!(restored, spec);
//! ```

use palette::Srgb;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::placement::Orientation;
use crate::text::parse_hex_color;

/// Smallest font size offered, in pixels.
pub const MIN_FONT_SIZE: u32 = 12;
/// Largest font size offered, in pixels.
pub const MAX_FONT_SIZE: u32 = 72;

pub const DEFAULT_TEXT: &str = "WATERMARK";
pub const DEFAULT_FONT_SIZE: u32 = 32;
pub const DEFAULT_OPACITY: f32 = 0.5;
pub const DEFAULT_COLOR: &str = "#FF6B6B";

/// The fixed colour swatches offered to the user.
pub const COLOR_SWATCHES: [&str; 10] = [
    "#FF6B6B", // coral
    "#4ECDC4", // turquoise
    "#FFD166", // yellow
    "#6A0572", // purple
    "#1A535C", // teal
    "#FF9AA2", // pink
    "#FFB7B2", // light pink
    "#FFDAC1", // peach
    "#E2F0CB", // light green
    "#B5EAD7", // mint
];

// ============================================================================
// WatermarkSpec
// ============================================================================

/// Watermark settings.
///
/// Fields are stored as given; the accessor methods return the values
/// actually used for rendering, clamped to their valid ranges.
///
/// # JSON Format
///
/// ```json
/// {
///   "text": "WATERMARK",
///   "fontSizePx": 32,
///   "opacity": 0.5,
///   "color": "#FF6B6B",
///   "orientation": "diagonal-tl-br",
///   "loop": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify), tsify(into_wasm_abi, from_wasm_abi))]
pub struct WatermarkSpec {
    /// Text to stamp. Empty means no watermark.
    pub text: String,

    /// Font size in pixels (12-72).
    pub font_size_px: u32,

    /// Global alpha of the text (0.0-1.0).
    pub opacity: f32,

    /// Fill colour as `#rrggbb` or `#rgb`.
    pub color: String,

    pub orientation: Orientation,

    /// Repeat the text across the whole image instead of once in the centre.
    #[serde(rename = "loop")]
    pub tiled: bool,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_size_px: DEFAULT_FONT_SIZE,
            opacity: DEFAULT_OPACITY,
            color: DEFAULT_COLOR.to_string(),
            orientation: Orientation::default(),
            tiled: false,
        }
    }
}

impl WatermarkSpec {
    /// Creates settings with the given text and default everything else.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the font size. The size is clamped to 12-72.
    pub fn with_font_size(mut self, px: u32) -> Self {
        self.font_size_px = px.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }

    /// Sets the opacity. The value is clamped to 0.0-1.0.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = sanitize_opacity(opacity);
        self
    }

    /// Sets the fill colour.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Enables or disables tiling.
    pub fn with_tiled(mut self, tiled: bool) -> Self {
        self.tiled = tiled;
        self
    }

    /// Returns true if there is text to draw.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Font size used for rendering.
    pub fn font_size(&self) -> u32 {
        self.font_size_px.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }

    /// Opacity used for rendering.
    pub fn alpha(&self) -> f32 {
        sanitize_opacity(self.opacity)
    }

    /// Fill colour used for rendering.
    ///
    /// An unparseable colour falls back to [`DEFAULT_COLOR`].
    pub fn fill(&self) -> Srgb<u8> {
        parse_hex_color(&self.color).unwrap_or_else(|| {
            warn!(color = %self.color, "invalid watermark colour, using default");
            default_fill()
        })
    }

    /// Serializes the settings to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the settings to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes settings from a JSON string. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn sanitize_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        DEFAULT_OPACITY
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

fn default_fill() -> Srgb<u8> {
    Srgb::new(0xff, 0x6b, 0x6b)
}
