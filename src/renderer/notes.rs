//! Note, chord, rest, accidental, ledger line and grace note geometry.

use crate::model::*;
use super::beams::StemDirection;
use super::constants::*;
use super::formatter::{GlyphExtents, NotePosition};
use super::metrics::GlyphMetrics;
use super::staff::StaveLayout;
use super::surface::{DisplayList, Glyph};

// ── Stem and modifier spacing ───────────────────────────────────────
const STEM_EXTENSION: [f64; 5] = [0.0, 0.0, 4.0, 9.0, 13.0]; // indexed by flag count
const DOT_OFFSET: f64 = 2.0; // first dot from the rightmost head
const ACCIDENTAL_CLEARANCE: i32 = 6; // half-spaces before two accidentals may share a column
const ARTICULATION_SPACING: f64 = 9.0;
const ORNAMENT_SPACING: f64 = 14.0;

// ── Grace notes ─────────────────────────────────────────────────────
const GRACE_STEM_LENGTH: f64 = STEM_LENGTH * GRACE_SCALE;
const GRACE_STEM_WIDTH: f64 = STEM_WIDTH * 0.85;
const GRACE_BEAM_THICKNESS: f64 = BEAM_THICKNESS * GRACE_SCALE;
const GRACE_SLASH_LENGTH: f64 = 7.0;

/// Stem direction of a note that is not in a beam: down when the middle of
/// the stack is on or above the middle line.
pub fn default_stem(note: &NoteEvent, clef: Clef) -> StemDirection {
    if note.rest || note.pitches.is_empty() {
        return StemDirection::Up;
    }
    let positions = note.pitches.iter().map(|p| p.staff_position(clef));
    let lowest = positions.clone().min().unwrap_or(MIDDLE_LINE_POSITION);
    let highest = positions.max().unwrap_or(MIDDLE_LINE_POSITION);
    if lowest + highest >= 2 * MIDDLE_LINE_POSITION {
        StemDirection::Down
    } else {
        StemDirection::Up
    }
}

/// For heads sorted bottom to top, which ones move to the far side of the
/// stem. A head a second (or unison) away from its neighbour moves unless
/// that neighbour already moved.
fn displaced_heads(sorted_positions: &[i32], stem: StemDirection) -> Vec<bool> {
    let n = sorted_positions.len();
    let mut displaced = vec![false; n];
    match stem {
        StemDirection::Up => {
            for i in 1..n {
                if sorted_positions[i] - sorted_positions[i - 1] <= 1 && !displaced[i - 1] {
                    displaced[i] = true;
                }
            }
        }
        StemDirection::Down => {
            for i in (0..n.saturating_sub(1)).rev() {
                if sorted_positions[i + 1] - sorted_positions[i] <= 1 && !displaced[i + 1] {
                    displaced[i] = true;
                }
            }
        }
    }
    displaced
}

/// Column for each `(slot, position)` accidental, 0 nearest the heads.
/// Returned in input order.
fn accidental_columns(entries: &[(usize, i32)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[b].1.cmp(&entries[a].1));

    let mut columns: Vec<Vec<i32>> = Vec::new();
    let mut assigned = vec![0; entries.len()];
    for i in order {
        let pos = entries[i].1;
        let column = columns
            .iter()
            .position(|col| col.iter().all(|&p| (p - pos).abs() >= ACCIDENTAL_CLEARANCE))
            .unwrap_or(columns.len());
        if column == columns.len() {
            columns.push(Vec::new());
        }
        columns[column].push(pos);
        assigned[i] = column;
    }
    assigned
}

struct AccidentalPlacement {
    kind: Accidental,
    slot: usize,
    /// Distance from the left edge of the heads to the accidental's left edge.
    offset: f64,
}

/// Accidental offsets and the total width of the columns.
fn place_accidentals(note: &NoteEvent, clef: Clef, metrics: &dyn GlyphMetrics) -> (Vec<AccidentalPlacement>, f64) {
    let entries: Vec<(usize, i32, Accidental)> = note
        .accidentals
        .iter()
        .enumerate()
        .filter_map(|(slot, acc)| {
            let pitch = note.pitches.get(slot)?;
            acc.map(|kind| (slot, pitch.staff_position(clef), kind))
        })
        .collect();
    if entries.is_empty() || note.rest {
        return (Vec::new(), 0.0);
    }

    let keys: Vec<(usize, i32)> = entries.iter().map(|&(s, p, _)| (s, p)).collect();
    let columns = accidental_columns(&keys);
    let column_count = columns.iter().max().map_or(0, |c| c + 1);

    let width_of = |kind: Accidental| metrics.width(&Glyph::Accidental { kind, grace: false });
    let mut column_widths = vec![0.0f64; column_count];
    for (&(_, _, kind), &c) in entries.iter().zip(&columns) {
        column_widths[c] = column_widths[c].max(width_of(kind));
    }

    let mut column_offsets = Vec::with_capacity(column_count);
    let mut total = 0.0;
    for w in &column_widths {
        total += w + ACCIDENTAL_GAP;
        column_offsets.push(total);
    }

    let placements = entries
        .iter()
        .zip(&columns)
        .map(|(&(slot, _, kind), &c)| AccidentalPlacement { kind, slot, offset: column_offsets[c] })
        .collect();
    (placements, total)
}

fn head_glyph(note: &NoteEvent) -> Glyph {
    if note.rest {
        Glyph::Rest(note.value)
    } else {
        Glyph::Notehead { value: note.value, grace: false }
    }
}

fn has_displaced(note: &NoteEvent, clef: Clef, stem: StemDirection) -> bool {
    let mut positions: Vec<i32> = note.pitches.iter().map(|p| p.staff_position(clef)).collect();
    positions.sort_unstable();
    !note.rest && displaced_heads(&positions, stem).iter().any(|&d| d)
}

fn dots_width(dots: u8, metrics: &dyn GlyphMetrics) -> f64 {
    if dots == 0 {
        0.0
    } else {
        DOT_OFFSET + (dots - 1) as f64 * DOT_SPACING + metrics.width(&Glyph::AugmentationDot)
    }
}

/// Horizontal extents the formatter needs for one note.
pub fn glyph_extents(
    note: &NoteEvent,
    stem: StemDirection,
    beamed: bool,
    clef: Clef,
    metrics: &dyn GlyphMetrics,
) -> GlyphExtents {
    let head = metrics.width(&head_glyph(note));
    let displaced = has_displaced(note, clef, stem);
    let (_, accidentals) = place_accidentals(note, clef, metrics);

    let mut left = accidentals;
    let mut right = 0.0;
    if displaced {
        match stem {
            StemDirection::Up => right += head,
            StemDirection::Down => left += head,
        }
    }
    right += dots_width(note.dots, metrics);

    let flagged = !note.rest && !beamed && note.value.has_stem() && note.value.flag_count() > 0;
    if flagged && stem.is_up() {
        let flag = metrics.width(&Glyph::Flag { count: note.value.flag_count(), stem_up: true, grace: false });
        right = right.max(flag);
    }

    GlyphExtents { left, head, right, grace_count: note.grace_notes.len() }
}

// ═══════════════════════════════════════════════════════════════════════
// Vertical geometry
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadGeometry {
    pub position: i32,
    pub x: f64,
    pub y: f64,
    pub displaced: bool,
}

/// Where a tie or slur attaches to one notehead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadAnchor {
    pub left_x: f64,
    pub right_x: f64,
    pub y: f64,
}

/// Resolved heads and stem of one note, once its x is known.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteGeometry {
    pub stem: StemDirection,
    /// In caller slot order.
    pub heads: Vec<HeadGeometry>,
    pub head_width: f64,
    pub has_stem: bool,
    pub stem_x: f64,
    /// Head end of the stem.
    pub stem_base_y: f64,
    pub stem_tip_y: f64,
    pub beamed: bool,
    natural_tip: f64,
}

impl NoteGeometry {
    /// Stem end before any beam adjusts it.
    pub fn natural_tip_y(&self) -> f64 {
        self.natural_tip
    }

    /// y of the head closest to the stem tip.
    pub fn head_nearest_tip_y(&self) -> f64 {
        let ys = self.heads.iter().map(|h| h.y);
        match self.stem {
            StemDirection::Up => ys.fold(f64::INFINITY, f64::min),
            StemDirection::Down => ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn top_y(&self) -> f64 {
        let heads = self.heads.iter().map(|h| h.y).fold(f64::INFINITY, f64::min);
        if self.has_stem && self.stem.is_up() {
            heads.min(self.stem_tip_y)
        } else {
            heads
        }
    }

    pub fn bottom_y(&self) -> f64 {
        let heads = self.heads.iter().map(|h| h.y).fold(f64::NEG_INFINITY, f64::max);
        if self.has_stem && !self.stem.is_up() {
            heads.max(self.stem_tip_y)
        } else {
            heads
        }
    }

    pub fn head_anchor(&self, slot: usize) -> Option<HeadAnchor> {
        self.heads.get(slot).map(|h| HeadAnchor {
            left_x: h.x,
            right_x: h.x + self.head_width,
            y: h.y,
        })
    }

    /// Attach the stem to a beam at `tip_y`.
    pub fn set_beam_tip(&mut self, tip_y: f64) {
        self.stem_tip_y = tip_y;
        self.beamed = true;
    }
}

pub fn note_geometry(
    note: &NoteEvent,
    position: &NotePosition,
    stave: &StaveLayout,
    stem: StemDirection,
) -> NoteGeometry {
    let head_width = position.head_width;

    if note.rest || note.pitches.is_empty() {
        let y = stave.middle_line_y();
        return NoteGeometry {
            stem,
            heads: vec![HeadGeometry { position: MIDDLE_LINE_POSITION, x: position.x, y, displaced: false }],
            head_width,
            has_stem: false,
            stem_x: position.center_x(),
            stem_base_y: y,
            stem_tip_y: y,
            beamed: false,
            natural_tip: y,
        };
    }

    let positions: Vec<i32> = note.pitches.iter().map(|p| p.staff_position(stave.clef)).collect();
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by_key(|&i| positions[i]);
    let sorted: Vec<i32> = order.iter().map(|&i| positions[i]).collect();
    let displaced_sorted = displaced_heads(&sorted, stem);

    let mut displaced = vec![false; positions.len()];
    for (k, &i) in order.iter().enumerate() {
        displaced[i] = displaced_sorted[k];
    }

    let shift = match stem {
        StemDirection::Up => head_width,
        StemDirection::Down => -head_width,
    };
    let heads: Vec<HeadGeometry> = positions
        .iter()
        .zip(&displaced)
        .map(|(&pos, &d)| HeadGeometry {
            position: pos,
            x: if d { position.x + shift } else { position.x },
            y: stave.y_for_position(pos),
            displaced: d,
        })
        .collect();

    let top = heads.iter().map(|h| h.y).fold(f64::INFINITY, f64::min);
    let bottom = heads.iter().map(|h| h.y).fold(f64::NEG_INFINITY, f64::max);
    let length = STEM_LENGTH + STEM_EXTENSION[note.value.flag_count().min(4)];
    let middle = stave.middle_line_y();

    let (stem_x, base, tip) = match stem {
        StemDirection::Up => (position.x + head_width, bottom, (top - length).min(middle)),
        StemDirection::Down => (position.x, top, (bottom + length).max(middle)),
    };

    NoteGeometry {
        stem,
        heads,
        head_width,
        has_stem: note.value.has_stem(),
        stem_x,
        stem_base_y: base,
        stem_tip_y: tip,
        beamed: false,
        natural_tip: tip,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Drawing
// ═══════════════════════════════════════════════════════════════════════

fn draw_ledger_lines(out: &mut DisplayList, stave: &StaveLayout, positions: &[i32], x1: f64, x2: f64, width: f64) {
    let lowest = positions.iter().copied().min().unwrap_or(0);
    let highest = positions.iter().copied().max().unwrap_or(0);

    let mut p = -2;
    while p >= lowest {
        let y = stave.y_for_position(p);
        out.line(x1, y, x2, y, width);
        p -= 2;
    }
    let mut p = TOP_LINE_POSITION + 2;
    while p <= highest {
        let y = stave.y_for_position(p);
        out.line(x1, y, x2, y, width);
        p += 2;
    }
}

/// Draw one note: ledger lines, heads, accidentals, dots, stem, flag,
/// articulations, ornaments and grace notes.
pub fn draw_note(
    out: &mut DisplayList,
    note: &NoteEvent,
    geometry: &NoteGeometry,
    position: &NotePosition,
    stave: &StaveLayout,
    metrics: &dyn GlyphMetrics,
) {
    let head_w = geometry.head_width;
    let heads_left = geometry.heads.iter().map(|h| h.x).fold(f64::INFINITY, f64::min);
    let heads_right = geometry.heads.iter().map(|h| h.x + head_w).fold(f64::NEG_INFINITY, f64::max);

    if note.rest {
        out.glyph(head_glyph(note), position.x, stave.middle_line_y());
    } else {
        let positions: Vec<i32> = geometry.heads.iter().map(|h| h.position).collect();
        draw_ledger_lines(
            out,
            stave,
            &positions,
            heads_left - LEDGER_LINE_EXTEND,
            heads_right + LEDGER_LINE_EXTEND,
            LEDGER_LINE_WIDTH,
        );
        for h in &geometry.heads {
            out.glyph(head_glyph(note), h.x, h.y);
        }

        let (accidentals, _) = place_accidentals(note, stave.clef, metrics);
        for a in &accidentals {
            if let Some(h) = geometry.heads.get(a.slot) {
                out.glyph(Glyph::Accidental { kind: a.kind, grace: false }, heads_left - a.offset, h.y);
            }
        }
    }

    // Dots sit in spaces: a head on a line pushes its dot up a half-space.
    for h in &geometry.heads {
        let y = if h.position % 2 == 0 { h.y - HALF_SPACE } else { h.y };
        for k in 0..note.dots {
            out.glyph(Glyph::AugmentationDot, heads_right + DOT_OFFSET + k as f64 * DOT_SPACING, y);
        }
    }

    if geometry.has_stem {
        out.line(geometry.stem_x, geometry.stem_base_y, geometry.stem_x, geometry.stem_tip_y, STEM_WIDTH);
        let flags = note.value.flag_count();
        if !geometry.beamed && flags > 0 {
            out.glyph(
                Glyph::Flag { count: flags, stem_up: geometry.stem.is_up(), grace: false },
                geometry.stem_x,
                geometry.stem_tip_y,
            );
        }
    }

    let center = position.center_x();
    let mut above = geometry.top_y().min(stave.top_line_y());
    let mut below = geometry.bottom_y();
    let head_top = geometry.heads.iter().map(|h| h.y).fold(f64::INFINITY, f64::min);
    let head_bottom = geometry.heads.iter().map(|h| h.y).fold(f64::NEG_INFINITY, f64::max);
    let mut near_above = head_top;
    let mut near_below = head_bottom;

    for &articulation in &note.articulations {
        let w = metrics.width(&Glyph::Articulation(articulation));
        let place_above = articulation
            .fixed_above()
            .unwrap_or(note.rest || !geometry.stem.is_up());
        let y = match (articulation.fixed_above(), place_above) {
            (Some(_), true) => {
                above -= MODIFIER_OFFSET;
                let y = above;
                above -= ARTICULATION_SPACING;
                y
            }
            (Some(_), false) => {
                below = below.max(stave.bottom_line_y()) + MODIFIER_OFFSET;
                let y = below;
                below += ARTICULATION_SPACING;
                y
            }
            (None, true) => {
                near_above -= MODIFIER_OFFSET;
                let y = near_above;
                near_above -= ARTICULATION_SPACING - MODIFIER_OFFSET;
                above = above.min(y - ARTICULATION_SPACING);
                y
            }
            (None, false) => {
                near_below += MODIFIER_OFFSET;
                let y = near_below;
                near_below += ARTICULATION_SPACING - MODIFIER_OFFSET;
                below = below.max(y + ARTICULATION_SPACING);
                y
            }
        };
        out.glyph(Glyph::Articulation(articulation), center - w / 2.0, y);
    }

    for &ornament in &note.ornaments {
        let w = metrics.width(&Glyph::Ornament(ornament));
        above -= MODIFIER_OFFSET;
        out.glyph(Glyph::Ornament(ornament), center - w / 2.0, above);
        above -= ORNAMENT_SPACING - MODIFIER_OFFSET;
    }

    draw_grace_notes(out, note, position, stave, metrics);
}

/// Small stem-up noteheads left of the principal. A lone grace note gets a
/// flag and a slash; a group shares one flat beam.
fn draw_grace_notes(
    out: &mut DisplayList,
    note: &NoteEvent,
    position: &NotePosition,
    stave: &StaveLayout,
    metrics: &dyn GlyphMetrics,
) {
    let graces = &note.grace_notes;
    if graces.is_empty() {
        return;
    }
    let head = Glyph::Notehead { value: GRACE_NOTE_VALUE, grace: true };
    let w = metrics.width(&head);

    let stems: Vec<(f64, f64)> = graces
        .iter()
        .zip(&position.grace_x)
        .map(|(g, &gx)| {
            let y = stave.y_for_pitch(&g.pitch);
            let pos = g.pitch.staff_position(stave.clef);
            draw_ledger_lines(out, stave, &[pos], gx - LEDGER_LINE_EXTEND / 2.0, gx + w + LEDGER_LINE_EXTEND / 2.0, LEDGER_LINE_WIDTH);
            out.glyph(head.clone(), gx, y);
            (gx + w, y)
        })
        .collect();

    if stems.len() == 1 {
        let (sx, y) = stems[0];
        let tip = y - GRACE_STEM_LENGTH;
        out.line(sx, y, sx, tip, GRACE_STEM_WIDTH);
        out.glyph(Glyph::Flag { count: GRACE_NOTE_VALUE.flag_count(), stem_up: true, grace: true }, sx, tip);
        let mid = y - GRACE_STEM_LENGTH * 0.4;
        out.line(
            sx - GRACE_SLASH_LENGTH * 0.5,
            mid + GRACE_SLASH_LENGTH * 0.4,
            sx + GRACE_SLASH_LENGTH * 0.5,
            mid - GRACE_SLASH_LENGTH * 0.4,
            LEDGER_LINE_WIDTH,
        );
        return;
    }

    let beam_y = stems
        .iter()
        .map(|&(_, y)| y - GRACE_STEM_LENGTH)
        .fold(f64::INFINITY, f64::min);
    for &(sx, y) in &stems {
        out.line(sx, y, sx, beam_y, GRACE_STEM_WIDTH);
    }
    if let (Some(&(x1, _)), Some(&(x2, _))) = (stems.first(), stems.last()) {
        let y = beam_y + GRACE_BEAM_THICKNESS / 2.0;
        out.line(x1, y, x2, y, GRACE_BEAM_THICKNESS);
    }
}
