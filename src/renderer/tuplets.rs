//! Tuplet brackets.

use serde::Serialize;

use crate::error::{ConfigError, RangeKind};
use crate::model::{Tuplet, MAX_TUPLET_RATIO};
use super::constants::*;
use super::formatter::NotePosition;
use super::notes::NoteGeometry;
use super::staff::StaveLayout;
use super::surface::{DisplayList, TextAnchor};

const TUPLET_TEXT_SIZE: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupletBracket {
    pub start: usize,
    pub end: usize,
    pub x1: f64,
    pub x2: f64,
    /// y of the bracket line.
    pub y: f64,
    pub above: bool,
    pub label: String,
}

impl TupletBracket {
    pub fn center_x(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }
}

/// The range must be a non-empty span of existing notes and both counts
/// must be non-zero.
pub fn validate_tuplet(tuplet: &Tuplet, len: usize) -> Result<(), ConfigError> {
    if tuplet.start >= tuplet.end || tuplet.end > len {
        return Err(ConfigError::InvalidRange {
            kind: RangeKind::Tuplet,
            start: tuplet.start,
            end: tuplet.end,
            len,
        });
    }
    let ratio = 1..=MAX_TUPLET_RATIO;
    if !ratio.contains(&tuplet.actual) || !ratio.contains(&tuplet.normal) {
        return Err(ConfigError::InvalidTupletRatio {
            actual: tuplet.actual,
            normal: tuplet.normal,
            max: MAX_TUPLET_RATIO,
        });
    }
    Ok(())
}

/// Place the bracket on the side most stems point to (above on a tie),
/// clear of every note it spans and of the staff.
pub fn layout_tuplet(
    tuplet: &Tuplet,
    positions: &[NotePosition],
    geometry: &[NoteGeometry],
    stave: &StaveLayout,
) -> TupletBracket {
    let span = &geometry[tuplet.range()];
    let up = span.iter().filter(|g| g.stem.is_up()).count();
    let above = up * 2 >= span.len();

    let y = if above {
        span.iter()
            .map(NoteGeometry::top_y)
            .fold(stave.top_line_y(), f64::min)
            - TUPLET_OFFSET
    } else {
        span.iter()
            .map(NoteGeometry::bottom_y)
            .fold(stave.bottom_line_y(), f64::max)
            + TUPLET_OFFSET
    };

    let mut x1 = positions[tuplet.start].x;
    let mut x2 = positions[tuplet.end - 1].right_x();
    if x2 - x1 < TUPLET_MIN_WIDTH {
        let center = (x1 + x2) / 2.0;
        x1 = center - TUPLET_MIN_WIDTH / 2.0;
        x2 = center + TUPLET_MIN_WIDTH / 2.0;
    }

    TupletBracket {
        start: tuplet.start,
        end: tuplet.end,
        x1,
        x2,
        y,
        above,
        label: tuplet.actual.to_string(),
    }
}

/// Bracket line broken around the centred label, with hooks towards the
/// notes at both ends.
pub fn draw_tuplet(out: &mut DisplayList, bracket: &TupletBracket) {
    let hook = if bracket.above { TUPLET_HOOK } else { -TUPLET_HOOK };
    let center = bracket.center_x();
    let gap = TUPLET_LABEL_GAP / 2.0;
    let y = bracket.y;

    out.line(bracket.x1, y + hook, bracket.x1, y, TUPLET_LINE_WIDTH);
    out.line(bracket.x1, y, center - gap, y, TUPLET_LINE_WIDTH);
    out.line(center + gap, y, bracket.x2, y, TUPLET_LINE_WIDTH);
    out.line(bracket.x2, y, bracket.x2, y + hook, TUPLET_LINE_WIDTH);
    out.text(center, y + TUPLET_TEXT_SIZE / 3.0, bracket.label.as_str(), TUPLET_TEXT_SIZE, TextAnchor::Middle);
}
