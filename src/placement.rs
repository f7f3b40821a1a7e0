//! Watermark placement geometry.
//!
//! Given a canvas size, measured text and an [`Orientation`], this module
//! works out where (and at what angle) the watermark text is stamped. It is
//! a pure computation with no knowledge of pixels or fonts.
//!
//! # Conventions
//!
//! Coordinates are in canvas pixels with the origin at the top-left and the
//! y-axis pointing down, so a positive rotation turns clockwise on screen.
//! Each [`Placement`] is an anchor point plus a rotation about that anchor;
//! the text itself is then drawn at a local offset given by
//! [`Orientation::text_offset`].
//!
//! ```text
//!  Horizontal      Vertical      DiagonalTlbr     DiagonalBltr
//!                     ▲              ╲               ╱
//!  ──────────▶        │               ╲             ╱
//!                     │                ▶           ▶
//! ```

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use resvg::tiny_skia::{Point, Transform};
use serde::{Deserialize, Serialize};

/// Horizontal tile spacing as a multiple of the text width.
const TILE_SPACING_X: f32 = 1.5;
/// Vertical tile spacing as a multiple of the font size.
const TILE_SPACING_Y: f32 = 3.0;
/// Diagonal tile spacing as a multiple of `text width + font size`.
const TILE_SPACING_DIAGONAL: f32 = 1.2;
/// Tiling gives up when a grid step is smaller than this many pixels.
const MIN_TILE_STEP: f32 = 1.0;

// ============================================================================
// Orientation
// ============================================================================

/// The angle class of the watermark text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum Orientation {
    /// Left to right, unrotated.
    #[default]
    Horizontal,
    /// Bottom to top, rotated a quarter turn counter-clockwise.
    Vertical,
    /// Top-left to bottom-right.
    #[serde(rename = "diagonal-tl-br")]
    #[cfg_attr(feature = "clap", value(name = "diagonal-tl-br"))]
    DiagonalTlbr,
    /// Bottom-left to top-right.
    #[serde(rename = "diagonal-bl-tr")]
    #[cfg_attr(feature = "clap", value(name = "diagonal-bl-tr"))]
    DiagonalBltr,
}

impl Orientation {
    /// All orientations, in display order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Horizontal,
        Orientation::Vertical,
        Orientation::DiagonalTlbr,
        Orientation::DiagonalBltr,
    ];

    /// Rotation applied about each anchor, in radians.
    pub fn rotation(self) -> f32 {
        match self {
            Orientation::Horizontal => 0.0,
            Orientation::Vertical => -FRAC_PI_2,
            Orientation::DiagonalTlbr => FRAC_PI_4,
            Orientation::DiagonalBltr => -FRAC_PI_4,
        }
    }

    /// Offset of the text origin from its anchor, in the rotated frame.
    ///
    /// Horizontal anchors already sit on the text baseline. Rotated text is
    /// centred on its anchor: shifted back by half its width and down by
    /// half the font size.
    pub fn text_offset(self, metrics: TextMetrics) -> (f32, f32) {
        match self {
            Orientation::Horizontal => (0.0, 0.0),
            _ => (-metrics.width / 2.0, metrics.font_size / 2.0),
        }
    }

    /// Returns true for the two diagonal orientations.
    pub fn is_diagonal(self) -> bool {
        matches!(self, Orientation::DiagonalTlbr | Orientation::DiagonalBltr)
    }
}

// ============================================================================
// TextMetrics
// ============================================================================

/// Measured size of the watermark text.
///
/// The font size stands in for the glyph height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    /// Advance width of the text in pixels.
    pub width: f32,
    /// Font size in pixels.
    pub font_size: f32,
}

impl TextMetrics {
    pub fn new(width: f32, font_size: f32) -> Self {
        Self { width, font_size }
    }

    /// Returns true if both dimensions are positive and finite.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite()
            && self.font_size.is_finite()
            && self.width > 0.0
            && self.font_size > 0.0
    }
}

// ============================================================================
// Placement
// ============================================================================

/// One instruction for drawing the watermark text once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Anchor x coordinate.
    pub x: f32,
    /// Anchor y coordinate.
    pub y: f32,
    /// Rotation about the anchor, in radians.
    pub rotation: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self { x, y, rotation }
    }

    /// Affine transform from text space to canvas space.
    ///
    /// Composed as `translate(anchor) · rotate(rotation) · translate(offset)`,
    /// so `offset` is expressed in the rotated frame.
    pub fn transform(&self, offset: (f32, f32)) -> Transform {
        Transform::from_translate(self.x, self.y)
            .pre_concat(Transform::from_rotate(self.rotation.to_degrees()))
            .pre_concat(Transform::from_translate(offset.0, offset.1))
    }

    /// Maps a point in text space to canvas space.
    pub fn map_point(&self, offset: (f32, f32), x: f32, y: f32) -> (f32, f32) {
        let mut point = Point::from_xy(x, y);
        self.transform(offset).map_point(&mut point);
        (point.x, point.y)
    }
}

// ============================================================================
// Placement computation
// ============================================================================

/// Computes every placement for one render, in drawing order.
///
/// Single mode (`tiled == false`) always yields exactly one placement
/// centred on the canvas. Tiled mode covers the canvas with a grid and
/// yields nothing for an empty canvas or unmeasurable text.
pub fn compute_placements(
    canvas_width: f32,
    canvas_height: f32,
    metrics: TextMetrics,
    orientation: Orientation,
    tiled: bool,
) -> Vec<Placement> {
    if !tiled {
        return vec![single_placement(canvas_width, canvas_height, metrics, orientation)];
    }

    let canvas_ok = canvas_width.is_finite()
        && canvas_height.is_finite()
        && canvas_width > 0.0
        && canvas_height > 0.0;
    if !canvas_ok || !metrics.is_drawable() {
        return Vec::new();
    }

    tiled_placements(canvas_width, canvas_height, metrics, orientation)
}

fn single_placement(
    canvas_width: f32,
    canvas_height: f32,
    metrics: TextMetrics,
    orientation: Orientation,
) -> Placement {
    match orientation {
        Orientation::Horizontal => Placement::new(
            (canvas_width - metrics.width) / 2.0,
            canvas_height / 2.0 + metrics.font_size / 2.0,
            0.0,
        ),
        _ => Placement::new(
            canvas_width / 2.0,
            canvas_height / 2.0,
            orientation.rotation(),
        ),
    }
}

fn tiled_placements(
    canvas_width: f32,
    canvas_height: f32,
    metrics: TextMetrics,
    orientation: Orientation,
) -> Vec<Placement> {
    let TextMetrics { width, font_size } = metrics;
    let rotation = orientation.rotation();
    let h_spacing = width * TILE_SPACING_X;
    let v_spacing = font_size * TILE_SPACING_Y;
    let d_spacing = (width + font_size) * TILE_SPACING_DIAGONAL;

    let steps_ok = |steps: &[f32]| steps.iter().all(|s| *s >= MIN_TILE_STEP);
    let usable = match orientation {
        Orientation::Horizontal | Orientation::Vertical => steps_ok(&[h_spacing, v_spacing]),
        Orientation::DiagonalTlbr | Orientation::DiagonalBltr => steps_ok(&[d_spacing]),
    };
    if !usable {
        return Vec::new();
    }

    match orientation {
        Orientation::Horizontal => sweep(v_spacing, canvas_height, v_spacing)
            .flat_map(|y| {
                sweep(h_spacing, canvas_width + width, h_spacing)
                    .map(move |x| Placement::new(x - width / 2.0, y, rotation))
            })
            .collect(),
        Orientation::Vertical => sweep(h_spacing, canvas_width, h_spacing)
            .flat_map(|x| {
                sweep(v_spacing, canvas_height + font_size, v_spacing)
                    .map(move |y| Placement::new(x, y, rotation))
            })
            .collect(),
        Orientation::DiagonalTlbr | Orientation::DiagonalBltr => {
            sweep(-canvas_height, canvas_height * 2.0, d_spacing)
                .flat_map(|y| {
                    sweep(-canvas_width, canvas_width * 2.0, d_spacing)
                        .map(move |x| Placement::new(x, y, rotation))
                })
                .collect()
        }
    }
}

/// Yields `start, start + step, ...` while the value stays below `end`.
///
/// Values are computed from the index rather than accumulated, so long
/// sweeps do not drift. `step` must be positive.
fn sweep(start: f32, end: f32, step: f32) -> impl Iterator<Item = f32> {
    (0u32..)
        .map(move |i| start + i as f32 * step)
        .take_while(move |v| *v < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn watermark_metrics() -> TextMetrics {
        TextMetrics::new(180.0, 32.0)
    }

    #[test]
    fn single_horizontal_matches_reference_values() {
        let placements =
            compute_placements(800.0, 600.0, watermark_metrics(), Orientation::Horizontal, false);
        assert_eq!(placements, vec![Placement::new(310.0, 316.0, 0.0)]);
    }

    #[test]
    fn single_horizontal_is_centred() {
        for (w, h, text) in [(800.0, 600.0, 180.0), (31.0, 17.0, 5.5), (1000.0, 10.0, 2000.0)] {
            let metrics = TextMetrics::new(text, 20.0);
            let p = compute_placements(w, h, metrics, Orientation::Horizontal, false)[0];
            assert!(approx(p.x + text / 2.0, w / 2.0));
            assert_eq!(p.rotation, 0.0);
        }
    }

    #[test]
    fn single_rotated_orientations_anchor_at_centre() {
        for orientation in [
            Orientation::Vertical,
            Orientation::DiagonalTlbr,
            Orientation::DiagonalBltr,
        ] {
            let placements = compute_placements(800.0, 600.0, watermark_metrics(), orientation, false);
            assert_eq!(placements.len(), 1);
            assert_eq!(placements[0].x, 400.0);
            assert_eq!(placements[0].y, 300.0);
            assert_eq!(placements[0].rotation, orientation.rotation());
        }
    }

    #[test]
    fn single_mode_always_yields_one_placement() {
        for orientation in Orientation::ALL {
            for metrics in [TextMetrics::new(0.0, 0.0), watermark_metrics()] {
                let placements = compute_placements(0.0, 0.0, metrics, orientation, false);
                assert_eq!(placements.len(), 1);
            }
        }
    }

    #[test]
    fn rotation_per_orientation() {
        let expected = [
            (Orientation::Horizontal, 0.0),
            (Orientation::Vertical, -FRAC_PI_2),
            (Orientation::DiagonalTlbr, FRAC_PI_4),
            (Orientation::DiagonalBltr, -FRAC_PI_4),
        ];
        for (orientation, rotation) in expected {
            for tiled in [false, true] {
                let placements =
                    compute_placements(800.0, 600.0, watermark_metrics(), orientation, tiled);
                assert!(!placements.is_empty());
                assert!(placements.iter().all(|p| p.rotation == rotation));
            }
        }
    }

    #[test]
    fn tiled_vertical_starts_at_first_spacing() {
        let placements =
            compute_placements(800.0, 600.0, watermark_metrics(), Orientation::Vertical, true);
        assert_eq!(placements[0], Placement::new(270.0, 96.0, -FRAC_PI_2));
        // Column-major: the second placement moves down, not across.
        assert_eq!(placements[1], Placement::new(270.0, 192.0, -FRAC_PI_2));
        // Columns at x = 270, 540; rows at y = 96..=576 (y < 632).
        assert_eq!(placements.len(), 2 * 6);
    }

    #[test]
    fn tiled_horizontal_grid() {
        let placements =
            compute_placements(800.0, 600.0, watermark_metrics(), Orientation::Horizontal, true);

        // Rows at y = 96..=576, columns at x = 270, 540, 810 (x < 980).
        assert_eq!(placements.len(), 6 * 3);
        assert_eq!(placements[0], Placement::new(180.0, 96.0, 0.0));
        assert_eq!(placements[1], Placement::new(450.0, 96.0, 0.0));
        assert_eq!(placements[3].y, 192.0);

        let rows = (600.0f32 / 96.0).floor() as isize;
        let cols = (800.0f32 / 270.0).floor() as isize;
        let per_row = placements.iter().filter(|p| p.y == 96.0).count() as isize;
        let row_count = placements.len() as isize / per_row;
        assert!((row_count - rows).abs() <= 1);
        assert!((per_row - cols).abs() <= 1);
    }

    #[test]
    fn tiled_diagonal_overscans_canvas() {
        let metrics = watermark_metrics();
        let spacing = (180.0 + 32.0) * 1.2;
        for orientation in [Orientation::DiagonalTlbr, Orientation::DiagonalBltr] {
            let placements = compute_placements(800.0, 600.0, metrics, orientation, true);

            assert_eq!(placements[0].x, -800.0);
            assert_eq!(placements[0].y, -600.0);
            assert!(approx(placements[1].x, -800.0 + spacing));
            assert!(placements.iter().all(|p| p.x < 1600.0 && p.y < 1200.0));

            let cols = (2400.0f32 / spacing).ceil() as usize;
            let rows = (1800.0f32 / spacing).ceil() as usize;
            assert_eq!(placements.len(), rows * cols);
        }
    }

    #[test]
    fn tiled_mode_short_circuits_degenerate_input() {
        for orientation in Orientation::ALL {
            let zero_width = compute_placements(800.0, 600.0, TextMetrics::new(0.0, 32.0), orientation, true);
            let zero_font = compute_placements(800.0, 600.0, TextMetrics::new(180.0, 0.0), orientation, true);
            let nan = compute_placements(800.0, 600.0, TextMetrics::new(f32::NAN, 32.0), orientation, true);
            let no_canvas = compute_placements(0.0, 600.0, watermark_metrics(), orientation, true);
            let negative = compute_placements(800.0, -1.0, watermark_metrics(), orientation, true);

            assert!(zero_width.is_empty());
            assert!(zero_font.is_empty());
            assert!(nan.is_empty());
            assert!(no_canvas.is_empty());
            assert!(negative.is_empty());
        }
    }

    #[test]
    fn tiled_mode_rejects_sub_pixel_steps() {
        let tiny = TextMetrics::new(1e-4, 32.0);
        assert!(compute_placements(800.0, 600.0, tiny, Orientation::Horizontal, true).is_empty());
        assert!(compute_placements(800.0, 600.0, tiny, Orientation::Vertical, true).is_empty());

        // Diagonal spacing also counts the font size, so it still tiles.
        let diagonal = compute_placements(800.0, 600.0, tiny, Orientation::DiagonalTlbr, true);
        assert!(!diagonal.is_empty());

        let both_tiny = TextMetrics::new(1e-4, 1e-4);
        for orientation in Orientation::ALL {
            assert!(compute_placements(800.0, 600.0, both_tiny, orientation, true).is_empty());
        }
    }

    #[test]
    fn sweep_does_not_drift() {
        let values: Vec<f32> = sweep(0.1, 1.0, 0.1).collect();
        assert_eq!(values.len(), 9);
        assert!(approx(*values.last().unwrap(), 0.9));
    }

    #[test]
    fn text_offset_centres_rotated_text() {
        let metrics = watermark_metrics();
        assert_eq!(Orientation::Horizontal.text_offset(metrics), (0.0, 0.0));
        for orientation in [
            Orientation::Vertical,
            Orientation::DiagonalTlbr,
            Orientation::DiagonalBltr,
        ] {
            assert_eq!(orientation.text_offset(metrics), (-90.0, 16.0));
        }
    }

    #[test]
    fn transform_rotates_about_anchor() {
        let p = Placement::new(400.0, 300.0, -FRAC_PI_2);

        let (ax, ay) = p.map_point((0.0, 0.0), 0.0, 0.0);
        assert!(approx(ax, 400.0) && approx(ay, 300.0));

        // Rotated a quarter turn counter-clockwise, text-space +x points up.
        let (x, y) = p.map_point((0.0, 0.0), 10.0, 0.0);
        assert!(approx(x, 400.0) && approx(y, 290.0));

        // The text offset is applied in the rotated frame.
        let (ox, oy) = p.map_point((-90.0, 16.0), 0.0, 0.0);
        assert!(approx(ox, 416.0) && approx(oy, 390.0));
    }

    #[test]
    fn horizontal_transform_is_pure_translation() {
        let t = Placement::new(310.0, 316.0, 0.0).transform((0.0, 0.0));
        assert!(approx(t.sx, 1.0) && approx(t.sy, 1.0));
        assert!(approx(t.kx, 0.0) && approx(t.ky, 0.0));
        assert!(approx(t.tx, 310.0) && approx(t.ty, 316.0));
    }

    #[test]
    fn orientation_serializes_kebab_case() {
        let names: Vec<String> = Orientation::ALL
            .iter()
            .map(|o| serde_json::to_string(o).unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "\"horizontal\"",
                "\"vertical\"",
                "\"diagonal-tl-br\"",
                "\"diagonal-bl-tr\""
            ]
        );
    }
}
