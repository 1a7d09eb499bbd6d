//! Text measurement for label particles.
//!
//! Label boxes are measured in pixels at a font size and then normalized by
//! a per-font height scale, so "Xy" and "xx" render at the same text size
//! even though their pixel boxes differ.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Sample used to find the worst-case glyph extents of a font.
pub const HEIGHT_SAMPLE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ-abcdefghijklmnopqrstuvwxyz_0123456789";

/// Extra height factor for every line after the first.
const LINE_SPACING: f64 = 1.1;

/// Fraction of the measured size added as padding around label text.
const LABEL_PADDING: f64 = 0.3;

/// Measures the pixel extent of a single line of text.
pub trait TextMeasure {
    /// Name of the measured font, as stored with each label.
    fn font_name(&self) -> &str;

    /// Width and height in pixels of `line` drawn at `font_size` with an
    /// outline of `stroke_width` pixels.
    fn line_extent(&self, line: &str, font_size: u32, stroke_width: u32) -> DVec2;
}

/// Glyph proportions of a font, as fractions of the font size.
///
/// Characters are classified as tall (capitals, digits and ascender
/// letters), short, or descending; wide letters get a larger advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    /// Font name stored with each label.
    pub name: String,
    /// Horizontal advance of a regular glyph.
    pub advance: f64,
    /// Horizontal advance of `m`, `w`, `M` and `W`.
    pub wide_advance: f64,
    /// Height above the baseline of tall glyphs.
    pub ascent: f64,
    /// Height above the baseline of short glyphs.
    pub x_height: f64,
    /// Depth below the baseline of descending glyphs.
    pub descent: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            name: "Stamp".to_string(),
            advance: 0.6,
            wide_advance: 0.85,
            ascent: 0.75,
            x_height: 0.5,
            descent: 0.22,
        }
    }
}

impl FontMetrics {
    fn glyph_advance(&self, c: char) -> f64 {
        match c {
            'm' | 'w' | 'M' | 'W' => self.wide_advance,
            _ => self.advance,
        }
    }

    fn glyph_top(&self, c: char) -> f64 {
        if c.is_uppercase() || c.is_ascii_digit() || "bdfhiklt'\"!?/()[]{}|".contains(c) {
            self.ascent
        } else if c.is_whitespace() {
            0.0
        } else {
            self.x_height
        }
    }

    fn glyph_bottom(&self, c: char) -> f64 {
        if "gjpqy_,;()[]{}|".contains(c) {
            self.descent
        } else {
            0.0
        }
    }
}

impl TextMeasure for FontMetrics {
    fn font_name(&self) -> &str {
        &self.name
    }

    fn line_extent(&self, line: &str, font_size: u32, stroke_width: u32) -> DVec2 {
        let size = font_size as f64;
        let stroke = 2.0 * stroke_width as f64;

        let width: f64 = line.chars().map(|c| self.glyph_advance(c)).sum();
        let top = line.chars().map(|c| self.glyph_top(c)).fold(0.0, f64::max);
        let bottom = line.chars().map(|c| self.glyph_bottom(c)).fold(0.0, f64::max);

        DVec2::new(width * size + stroke, (top + bottom) * size + stroke)
    }
}

/// Outline stroke width used for labels at `font_size`.
#[inline]
pub fn outline_stroke_width(font_size: u32) -> u32 {
    font_size / 8
}

/// Pixel extent of possibly multiline text: widest line by summed line
/// heights, with extra spacing from the second line on.
pub fn multiline_extent(measure: &dyn TextMeasure, text: &str, font_size: u32) -> DVec2 {
    let stroke = outline_stroke_width(font_size);
    let mut extent = DVec2::ZERO;
    let mut spacing = 1.0;
    for line in text.split('\n') {
        let line_extent = measure.line_extent(line, font_size, stroke);
        extent.x = extent.x.max(line_extent.x);
        extent.y += line_extent.y * spacing;
        spacing = LINE_SPACING;
    }
    extent
}

/// Scale factor that maps the tallest possible line of this font to height 1.
///
/// Computed once per font and size and shared by every label, so all labels
/// read at the same apparent text size.
pub fn label_height_scale(measure: &dyn TextMeasure, font_size: u32) -> f64 {
    let height = multiline_extent(measure, HEIGHT_SAMPLE, font_size).y;
    if height > 0.0 { 1.0 / height } else { 1.0 }
}

/// Bounding-box size of a label in graph units.
pub fn label_box_size(
    measure: &dyn TextMeasure,
    text: &str,
    font_size: u32,
    height_scale: f64,
) -> DVec2 {
    let pixels = multiline_extent(measure, text, font_size);
    let padded = (pixels + pixels * LABEL_PADDING).floor();
    padded * height_scale
}
