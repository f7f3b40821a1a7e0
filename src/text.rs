//! Text measurement and rasterisation using fontdue and resvg/usvg.
//!
//! Watermark text is rendered by building a small SVG document with one
//! `<text>` element per placement and rasterising it with resvg. The same
//! font face is handed to fontdue to measure advance widths, so the layout
//! used by the placement engine matches what ends up on screen.

use std::sync::Arc;

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};
use palette::Srgb;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::fontdb::{Database, Family, ID, Query, Style, Weight};
use resvg::usvg::{Options, Tree};
use tracing::{debug, warn};

use crate::placement::TextMetrics;

// ============================================================================
// FontBook
// ============================================================================

/// Sans-serif families tried, in order, for the generic `sans-serif` slot.
const SANS_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Arial",
];

/// The font used to draw watermarks.
///
/// Holds a font database for resvg and, when a usable face was found, a
/// fontdue copy of that face for measuring. The preferred face is a bold
/// sans-serif; otherwise the boldest upright face available is used.
pub struct FontBook {
    db: Arc<Database>,
    face: Option<Face>,
}

struct Face {
    family: String,
    weight: u16,
    font: Font,
}

impl FontBook {
    /// A font book with no fonts. Text measures as zero width and draws
    /// nothing.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(Database::new()),
            face: None,
        }
    }

    /// Loads the fonts installed on the system.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        Self::from_database(db)
    }

    /// Loads a single font file (TTF, OTF or a collection).
    pub fn from_bytes(font_data: Vec<u8>) -> Self {
        Self::from_fonts([font_data])
    }

    /// Loads several font files, e.g. the regular and bold faces of a family.
    pub fn from_fonts(fonts: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut db = Database::new();
        for data in fonts {
            db.load_font_data(data);
        }
        Self::from_database(db)
    }

    fn from_database(mut db: Database) -> Self {
        let face = select_face(&mut db);
        match &face {
            Some(face) => debug!(
                family = %face.family,
                weight = face.weight,
                faces = db.len(),
                "selected watermark font"
            ),
            None => warn!(faces = db.len(), "no usable font found; watermark text will not be drawn"),
        }
        Self {
            db: Arc::new(db),
            face,
        }
    }

    /// Returns true if a face is available for drawing.
    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }

    /// Family name of the selected face.
    pub fn family(&self) -> Option<&str> {
        self.face.as_ref().map(|f| f.family.as_str())
    }

    /// CSS weight of the selected face (400 regular, 700 bold).
    pub fn weight(&self) -> Option<u16> {
        self.face.as_ref().map(|f| f.weight)
    }

    /// Measures `text` at `font_size` pixels.
    ///
    /// The width is the sum of glyph advances plus kerning, which is what
    /// a canvas `measureText` reports.
    pub fn measure(&self, text: &str, font_size: f32) -> TextMetrics {
        let width = match &self.face {
            Some(face) => advance_width(&face.font, text, font_size),
            None => 0.0,
        };
        TextMetrics::new(width, font_size)
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::empty()
    }
}

fn select_face(db: &mut Database) -> Option<Face> {
    let installed = SANS_FAMILIES
        .iter()
        .copied()
        .find(|name| db.faces().any(|info| info.families.iter().any(|(f, _)| f == name)));
    if let Some(name) = installed {
        db.set_sans_serif_family(name);
    }

    let query = Query {
        families: &[Family::SansSerif],
        weight: Weight::BOLD,
        ..Query::default()
    };
    let id = db.query(&query).or_else(|| boldest_upright_face(db))?;
    let info = db.face(id)?;
    let family = info.families.first()?.0.clone();
    let weight = info.weight.0;

    let font = db
        .with_face_data(id, |data, index| {
            let settings = FontSettings {
                collection_index: index,
                ..FontSettings::default()
            };
            Font::from_bytes(data, settings)
        })?
        .map_err(|e| warn!(family = %family, error = e, "failed to parse font face"))
        .ok()?;

    Some(Face { family, weight, font })
}

fn boldest_upright_face(db: &Database) -> Option<ID> {
    db.faces()
        .min_by_key(|info| fallback_rank(info.style, info.weight))
        .map(|info| info.id)
}

/// Lower ranks first: upright before slanted, then closest to bold.
fn fallback_rank(style: Style, weight: Weight) -> (bool, u16) {
    (style != Style::Normal, weight.0.abs_diff(Weight::BOLD.0))
}

fn advance_width(font: &Font, text: &str, font_size: f32) -> f32 {
    let mut width = 0.0;
    let mut prev = None;
    for c in text.chars() {
        if let Some(p) = prev {
            width += font.horizontal_kern(p, c, font_size).unwrap_or(0.0);
        }
        width += font.metrics(c, font_size).advance_width;
        prev = Some(c);
    }
    width
}

// ============================================================================
// Text layer
// ============================================================================

/// Drawing state shared by every stamp in a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Srgb<u8>,
    /// Global alpha in 0.0-1.0.
    pub opacity: f32,
}

/// Builds the SVG document for a text layer.
///
/// Each transform places one copy of `text` with its origin at the
/// transformed `(0, 0)`. Opacity is set per element so overlapping copies
/// blend with each other like repeated semi-transparent fills.
pub fn text_layer_svg(
    width: u32,
    height: u32,
    family: &str,
    text: &str,
    style: &TextStyle,
    transforms: &[Transform],
) -> String {
    let (red, green, blue) = (style.color.red, style.color.green, style.color.blue);
    let text = escape_xml(text);

    let header = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let group = format!(
        r##"<g font-family="{}" font-weight="bold" font-size="{}" fill="#{red:02x}{green:02x}{blue:02x}" fill-opacity="{}" xml:space="preserve">"##,
        escape_xml(family),
        style.font_size,
        style.opacity,
    );
    let stamps: String = transforms
        .iter()
        .map(|t| {
            format!(
                r#"<text transform="matrix({} {} {} {} {} {})">{text}</text>"#,
                t.sx, t.ky, t.kx, t.sy, t.tx, t.ty
            )
        })
        .collect();

    [header, group, stamps, "</g></svg>".to_string()].concat()
}

/// Rasterises `text` once per transform into a transparent layer.
///
/// Returns `None` if there is no font, nothing to draw (including an empty
/// canvas), or the layer could not be parsed or allocated.
pub fn render_text_layer(
    fonts: &FontBook,
    width: u32,
    height: u32,
    text: &str,
    style: &TextStyle,
    transforms: &[Transform],
) -> Option<RgbaImage> {
    let family = fonts.family()?;
    if width == 0 || height == 0 || transforms.is_empty() || style.opacity <= 0.0 {
        return None;
    }

    let svg = text_layer_svg(width, height, family, text, style, transforms);
    let opts = Options {
        font_family: family.to_string(),
        fontdb: Arc::clone(&fonts.db),
        ..Options::default()
    };
    let tree = match Tree::from_str(&svg, &opts) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(error = %e, "failed to parse text layer");
            return None;
        }
    };

    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Some(pixmap_to_rgba_image(&pixmap))
}

/// Parses a `#rgb` or `#rrggbb` colour.
pub fn parse_hex_color(hex: &str) -> Option<Srgb<u8>> {
    hex.trim().parse::<Srgb<u8>>().ok()
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Pixel conversion and compositing
// ============================================================================

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia uses premultiplied alpha
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }

    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination). Pixels falling
/// outside the destination are clipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }
        if src_pixel[3] == 0 {
            continue;
        }

        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = alpha_blend(*src_pixel, *dst_pixel);
    }
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}


/// Fonts bundled under `tests/fonts` so rendering tests never depend on the
/// host's installed fonts.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::FontBook;

    pub const SANS: &[u8] = include_bytes!("../tests/fonts/DejaVuSans.ttf");
    pub const SANS_BOLD: &[u8] = include_bytes!("../tests/fonts/DejaVuSans-Bold.ttf");

    pub fn sans_bold() -> FontBook {
        FontBook::from_bytes(SANS_BOLD.to_vec())
    }

    pub fn sans_family() -> FontBook {
        FontBook::from_fonts([SANS.to_vec(), SANS_BOLD.to_vec()])
    }
}
