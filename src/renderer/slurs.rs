//! Tie and slur routing.
//!
//! A tie joins one notehead to the matching head of the next note with a
//! flat, symmetric arc. A slur (curve) joins any two notes with control
//! points pushed away from the heads by fixed offsets. Both bulge away from
//! the stem of the note they start on.

use serde::Serialize;

use crate::error::{ConfigError, RangeKind};
use crate::model::{Curve, NoteEvent, Tie};
use super::constants::*;
use super::notes::{HeadAnchor, NoteGeometry};
use super::surface::{Bezier, DisplayList, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CurveKind {
    Tie,
    Slur,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveLayout {
    pub kind: CurveKind,
    pub from: usize,
    pub to: usize,
    /// Bulges below the notes.
    pub below: bool,
    pub curve: Bezier,
}

pub fn validate_tie(tie: &Tie, notes: &[NoteEvent]) -> Result<(), ConfigError> {
    if tie.index >= notes.len().saturating_sub(1) {
        return Err(ConfigError::InvalidRange {
            kind: RangeKind::Tie,
            start: tie.index,
            end: tie.index.saturating_add(1),
            len: notes.len(),
        });
    }
    for (note, slot) in [(tie.index, tie.first_slot), (tie.index + 1, tie.last_slot)] {
        let heads = notes[note].pitches.len();
        if slot >= heads {
            return Err(ConfigError::HeadSlotOutOfRange { note, slot, heads });
        }
    }
    Ok(())
}

pub fn validate_curve(curve: &Curve, len: usize) -> Result<(), ConfigError> {
    if curve.from > curve.to || curve.to >= len {
        return Err(ConfigError::InvalidRange {
            kind: RangeKind::Curve,
            start: curve.from,
            end: curve.to,
            len,
        });
    }
    Ok(())
}

/// Sign of y movement away from the heads: +1 (down the page) when the stem
/// points up.
fn bulge(first: &NoteGeometry) -> f64 {
    if first.stem.is_up() {
        1.0
    } else {
        -1.0
    }
}

pub fn route_tie(index: usize, first: HeadAnchor, last: HeadAnchor, first_geometry: &NoteGeometry) -> CurveLayout {
    let dir = bulge(first_geometry);
    let start = Point::new(first.right_x + TIE_X_GAP, first.y + dir * TIE_Y_SHIFT);
    let end = Point::new(last.left_x - TIE_X_GAP, last.y + dir * TIE_Y_SHIFT);
    let third = (end.x - start.x) / 3.0;

    CurveLayout {
        kind: CurveKind::Tie,
        from: index,
        to: index + 1,
        below: dir > 0.0,
        curve: Bezier {
            start,
            cp1: Point::new(start.x + third, start.y + dir * TIE_HEIGHT),
            cp2: Point::new(end.x - third, end.y + dir * TIE_HEIGHT),
            end,
        },
    }
}

/// Slur from the right of the first note's heads to the left of the last
/// note's heads, anchored at the head end of each stem.
pub fn route_curve(curve: &Curve, first: &NoteGeometry, last: &NoteGeometry) -> CurveLayout {
    let dir = bulge(first);
    let first_x = first
        .heads
        .iter()
        .map(|h| h.x + first.head_width)
        .fold(f64::NEG_INFINITY, f64::max);
    let last_x = last.heads.iter().map(|h| h.x).fold(f64::INFINITY, f64::min);
    let first_y = first.stem_base_y + dir * CURVE_Y_SHIFT;
    let last_y = last.stem_base_y + dir * CURVE_Y_SHIFT;

    // Two control points, spaced a quarter of the span in from each end.
    let spacing = (last_x - first_x) / 4.0;

    CurveLayout {
        kind: CurveKind::Slur,
        from: curve.from,
        to: curve.to,
        below: dir > 0.0,
        curve: Bezier {
            start: Point::new(first_x, first_y),
            cp1: Point::new(first_x + spacing, first_y + dir * CURVE_CP1_OFFSET),
            cp2: Point::new(last_x - spacing, last_y + dir * CURVE_CP2_OFFSET),
            end: Point::new(last_x, last_y),
        },
    }
}

pub fn draw_curve(out: &mut DisplayList, layout: &CurveLayout) {
    let thickness = match layout.kind {
        CurveKind::Tie => TIE_THICKNESS,
        CurveKind::Slur => CURVE_THICKNESS,
    };
    out.curve(layout.curve, thickness);
}
