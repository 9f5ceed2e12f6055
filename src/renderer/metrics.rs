//! Glyph metrics: advance widths the layout engine reserves for each glyph.

use crate::model::{Accidental, Clef, NoteValue};
use super::constants::*;
use super::surface::Glyph;

/// Source of glyph advance widths. Implement this to match the font a real
/// backend draws with; [`StandardMetrics`] matches [`super::SvgSurface`].
pub trait GlyphMetrics {
    fn width(&self, glyph: &Glyph) -> f64;
}

const TIMESIG_DIGIT_WIDTH: f64 = 12.0;
const TEXT_CHAR_WIDTH_FACTOR: f64 = 0.6;

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetrics;

impl GlyphMetrics for StandardMetrics {
    fn width(&self, glyph: &Glyph) -> f64 {
        match glyph {
            Glyph::Notehead { value, grace } => {
                let w = if *value == NoteValue::Whole { WHOLE_NOTEHEAD_WIDTH } else { NOTEHEAD_WIDTH };
                if *grace { w * GRACE_SCALE } else { w }
            }
            Glyph::Rest(value) => match value {
                NoteValue::Whole | NoteValue::Half => 14.0,
                NoteValue::Quarter | NoteValue::Eighth => 10.0,
                _ => 12.0,
            },
            Glyph::Accidental { kind, grace } => {
                let w = match kind {
                    Accidental::DoubleFlat => 14.0,
                    Accidental::DoubleSharp => 10.0,
                    _ => ACCIDENTAL_WIDTH,
                };
                if *grace { w * GRACE_SCALE } else { w }
            }
            Glyph::Clef(clef) => match clef {
                Clef::Treble | Clef::Bass => 26.0,
                Clef::Alto | Clef::Tenor => 22.0,
            },
            Glyph::Flag { grace, .. } => if *grace { 8.0 * GRACE_SCALE } else { 8.0 },
            Glyph::AugmentationDot => 3.0,
            Glyph::RepeatDot => REPEAT_DOT_RADIUS * 2.0,
            Glyph::Ornament(_) => 12.0,
            Glyph::Articulation(_) => 8.0,
            Glyph::TimeSignature(ts) => {
                let digits = ts.numerator.to_string().len().max(ts.denominator.to_string().len());
                digits as f64 * TIMESIG_DIGIT_WIDTH
            }
            Glyph::Text { content, size, .. } => {
                content.chars().count() as f64 * size * TEXT_CHAR_WIDTH_FACTOR
            }
        }
    }
}
