//! SVG render surface. Accumulates SVG elements and produces the final string.

use serde::Deserialize;

use crate::error::SurfaceError;
use crate::model::{Accidental, Articulation, Clef, NoteValue, Ornament};
use super::constants::*;
use super::metrics::{GlyphMetrics, StandardMetrics};
use super::surface::{Bezier, Glyph, Point, RenderSurface, TextAnchor};

const INK_COLOR: &str = "#1a1a1a";
const MUSIC_FONT: &str = "Bravura, 'Noto Music', serif";
const TEXT_FONT: &str = "Georgia, 'Times New Roman', serif";

/// Surface initialisation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfaceConfig {
    /// Id of the element the surface renders into.
    #[serde(alias = "canvasTargetId")]
    pub canvas_div_id: String,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub scale: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            canvas_div_id: "score".to_string(),
            canvas_width: 1200.0,
            canvas_height: 400.0,
            scale: 1.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SvgSurface
// ═══════════════════════════════════════════════════════════════════════

pub struct SvgSurface {
    elements: Vec<String>,
    target_id: String,
    width: f64,
    height: f64,
    scale: f64,
    metrics: StandardMetrics,
}

impl SvgSurface {
    /// Create a surface of `canvas_width` x `canvas_height`; drawing
    /// coordinates are multiplied by `scale`.
    pub fn initialize(config: &SurfaceConfig) -> Result<Self, SurfaceError> {
        if config.canvas_div_id.trim().is_empty() {
            return Err(SurfaceError::MissingTarget);
        }
        if !(config.canvas_width > 0.0 && config.canvas_height > 0.0) {
            return Err(SurfaceError::InvalidDimensions {
                width: config.canvas_width,
                height: config.canvas_height,
            });
        }
        if !(config.scale > 0.0) {
            return Err(SurfaceError::InvalidScale(config.scale));
        }
        log::debug!(
            "svg surface '{}' {}x{} scale {}",
            config.canvas_div_id, config.canvas_width, config.canvas_height, config.scale
        );
        Ok(Self {
            elements: Vec::new(),
            target_id: config.canvas_div_id.clone(),
            width: config.canvas_width,
            height: config.canvas_height,
            scale: config.scale,
            metrics: StandardMetrics,
        })
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" viewBox="0 0 {} {}" width="{}" height="{}">"#,
            escape(&self.target_id), self.width, self.height, self.width, self.height
        );
        svg.push('\n');
        svg.push_str(&format!(r#"  <g transform="scale({})">"#, self.scale));
        svg.push('\n');
        for el in &self.elements {
            svg.push_str("    ");
            svg.push_str(el);
            svg.push('\n');
        }
        svg.push_str("  </g>\n</svg>\n");
        svg
    }

    fn music_text(&mut self, x: f64, y: f64, symbol: &str, size: f64) {
        self.elements.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{:.0}" fill="{}" dominant-baseline="central">{}</text>"#,
            x, y, MUSIC_FONT, size, INK_COLOR, symbol
        ));
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64) {
        self.elements.push(format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/>"#,
            cx, cy, r, INK_COLOR
        ));
    }

    fn notehead(&mut self, x: f64, cy: f64, value: NoteValue, grace: bool) {
        let w = self.metrics.width(&Glyph::Notehead { value, grace });
        let rx = w / 2.0;
        let ry = if grace { HALF_SPACE * GRACE_SCALE } else { HALF_SPACE } - 0.5;
        let cx = x + rx;
        if value.is_filled() {
            self.elements.push(format!(
                r#"<ellipse cx="{:.1}" cy="{:.1}" rx="{:.1}" ry="{:.1}" fill="{}" transform="rotate(-15,{:.1},{:.1})"/>"#,
                cx, cy, rx, ry, INK_COLOR, cx, cy
            ));
        } else {
            let sw = if value == NoteValue::Whole { 2.4 } else { 1.8 };
            self.elements.push(format!(
                r#"<ellipse cx="{:.1}" cy="{:.1}" rx="{:.1}" ry="{:.1}" fill="none" stroke="{}" stroke-width="{:.1}" transform="rotate(-15,{:.1},{:.1})"/>"#,
                cx, cy, rx - sw / 2.0, ry - sw / 2.0, INK_COLOR, sw, cx, cy
            ));
        }
    }

    fn flag(&mut self, x: f64, y: f64, count: usize, stem_up: bool, grace: bool) {
        let scale = if grace { GRACE_SCALE } else { 1.0 };
        let dir = if stem_up { 1.0 } else { -1.0 };
        for i in 0..count {
            let fy = y + dir * i as f64 * 7.0 * scale;
            let path = format!(
                "M{:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                x, fy,
                x + 2.0 * scale, fy + dir * 6.0 * scale,
                x + 9.0 * scale, fy + dir * 9.0 * scale,
                x + 6.0 * scale, fy + dir * 18.0 * scale,
            );
            self.elements.push(format!(
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="{:.1}"/>"#,
                path, INK_COLOR, 1.6 * scale
            ));
        }
    }
}

fn escape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            // Other control characters are not valid XML text.
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn rest_symbol(value: NoteValue) -> &'static str {
    match value {
        NoteValue::Whole => "\u{1D13B}",
        NoteValue::Half => "\u{1D13C}",
        NoteValue::Quarter => "\u{1D13D}",
        NoteValue::Eighth => "\u{1D13E}",
        NoteValue::Sixteenth => "\u{1D13F}",
        NoteValue::ThirtySecond => "\u{1D140}",
        NoteValue::SixtyFourth => "\u{1D141}",
    }
}

fn accidental_symbol(kind: Accidental) -> &'static str {
    match kind {
        Accidental::DoubleFlat => "\u{1D12B}",
        Accidental::Flat => "\u{266D}",
        Accidental::Natural => "\u{266E}",
        Accidental::Sharp => "\u{266F}",
        Accidental::DoubleSharp => "\u{1D12A}",
    }
}

fn ornament_symbol(kind: Ornament) -> &'static str {
    match kind {
        Ornament::Trill => "tr",
        Ornament::Mordent => "\u{1D1A0}",
        Ornament::InvertedMordent => "\u{1D19F}",
        Ornament::Turn => "\u{1D197}",
        Ornament::InvertedTurn => "\u{1D198}",
    }
}

impl RenderSurface for SvgSurface {
    fn draw_line(&mut self, from: Point, to: Point, width: f64) -> Result<(), SurfaceError> {
        self.elements.push(format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{:.1}" stroke-linecap="butt"/>"#,
            from.x, from.y, to.x, to.y, INK_COLOR, width
        ));
        Ok(())
    }

    /// Filled crescent: the curve out, then back with its control points
    /// pushed `thickness` further along the bulge.
    fn draw_curve(&mut self, curve: &Bezier, thickness: f64) -> Result<(), SurfaceError> {
        let mid_y = (curve.start.y + curve.end.y) / 2.0;
        let bulge = if (curve.cp1.y + curve.cp2.y) / 2.0 >= mid_y { 1.0 } else { -1.0 };
        let off = bulge * thickness;
        let Bezier { start: s, cp1: c1, cp2: c2, end: e } = *curve;
        let path = format!(
            "M{:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1} Z",
            s.x, s.y,
            c1.x, c1.y, c2.x, c2.y, e.x, e.y,
            c2.x, c2.y + off, c1.x, c1.y + off, s.x, s.y,
        );
        self.elements.push(format!(r#"<path d="{}" fill="{}" stroke="none"/>"#, path, INK_COLOR));
        Ok(())
    }

    fn draw_glyph(&mut self, glyph: &Glyph, at: Point) -> Result<(), SurfaceError> {
        let Point { x, y } = at;
        match glyph {
            Glyph::Notehead { value, grace } => self.notehead(x, y, *value, *grace),
            Glyph::Rest(value) => self.music_text(x, y, rest_symbol(*value), 32.0),
            Glyph::Accidental { kind, grace } => {
                let size = if *grace { 20.0 * GRACE_SCALE } else { 20.0 };
                self.music_text(x, y, accidental_symbol(*kind), size);
            }
            Glyph::Clef(clef) => {
                let (symbol, cy) = match clef {
                    Clef::Treble => ("\u{1D11E}", y + 3.0 * STAFF_LINE_SPACING),
                    Clef::Bass => ("\u{1D122}", y + STAFF_LINE_SPACING),
                    Clef::Alto => ("\u{1D121}", y + 2.0 * STAFF_LINE_SPACING),
                    Clef::Tenor => ("\u{1D121}", y + STAFF_LINE_SPACING),
                };
                self.music_text(x, cy, symbol, 40.0);
            }
            Glyph::Flag { count, stem_up, grace } => self.flag(x, y, *count, *stem_up, *grace),
            Glyph::AugmentationDot => self.circle(x + 1.5, y, 1.5),
            Glyph::RepeatDot => self.circle(x + REPEAT_DOT_RADIUS, y, REPEAT_DOT_RADIUS),
            Glyph::Ornament(kind) => self.music_text(x, y, ornament_symbol(*kind), 16.0),
            Glyph::Articulation(kind) => match kind {
                Articulation::Staccato => self.circle(x + 4.0, y, 1.6),
                Articulation::Staccatissimo => self.music_text(x, y, "\u{25BE}", 10.0),
                Articulation::Accent => self.music_text(x, y, "&gt;", 14.0),
                Articulation::Tenuto => {
                    self.draw_line(Point::new(x, y), Point::new(x + 8.0, y), 1.5)?;
                }
                Articulation::Marcato => self.music_text(x, y, "^", 14.0),
                Articulation::FermataAbove => self.music_text(x, y, "\u{1D110}", 24.0),
                Articulation::FermataBelow => self.music_text(x, y, "\u{1D111}", 24.0),
            },
            Glyph::TimeSignature(ts) => {
                let cx = x + self.metrics.width(glyph) / 2.0;
                for (n, line_y) in [(ts.numerator, y + STAFF_LINE_SPACING), (ts.denominator, y + 3.0 * STAFF_LINE_SPACING)] {
                    self.elements.push(format!(
                        r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="22" font-weight="bold" fill="{}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
                        cx, line_y, TEXT_FONT, INK_COLOR, n
                    ));
                }
            }
            Glyph::Text { content, size, anchor } => {
                let anchor = match anchor {
                    TextAnchor::Start => "start",
                    TextAnchor::Middle => "middle",
                    TextAnchor::End => "end",
                };
                self.elements.push(format!(
                    r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{:.0}" fill="{}" text-anchor="{}">{}</text>"#,
                    x, y, TEXT_FONT, size, INK_COLOR, anchor, escape(content)
                ));
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.elements.clear();
        Ok(())
    }
}
