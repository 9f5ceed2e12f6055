//! Stave renderer: lays out one measure on one stave and draws it.
//!
//! The pass runs in a fixed order. Input is validated first, then the stave
//! furniture reserves its space, beams are grouped (which fixes stem
//! directions), the formatter assigns x positions, and finally beams,
//! tuplet brackets, ties and slurs are routed from the resolved note
//! geometry. Everything is recorded into a [`DisplayList`]; a caller's
//! surface only sees it once the whole pass has succeeded.

mod constants;
mod surface;
mod metrics;
mod svg_builder;
mod staff;
mod beams;
mod formatter;
mod notes;
mod tuplets;
mod slurs;

use std::ops::Range;

use serde::Serialize;

use crate::error::{ConfigError, RenderError};
use crate::model::*;

pub use beams::{default_scheme, group_beams, Beam, BeamGrouping, BeamLayout, BeamSegment, StemDirection};
pub use formatter::{format_notes, GlyphExtents, NotePosition};
pub use metrics::{GlyphMetrics, StandardMetrics};
pub use notes::{HeadAnchor, HeadGeometry, NoteGeometry};
pub use slurs::{CurveKind, CurveLayout};
pub use staff::StaveLayout;
pub use surface::{Bezier, DisplayList, DrawCommand, Glyph, Point, RenderSurface, TextAnchor};
pub use svg_builder::{SurfaceConfig, SvgSurface};
pub use tuplets::TupletBracket;

/// Everything one layout pass resolved, plus what it drew.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureLayout {
    #[serde(skip)]
    pub stave: StaveLayout,
    pub stave_width: f64,
    pub note_start_x: f64,
    pub note_end_x: f64,
    pub positions: Vec<NotePosition>,
    pub stems: Vec<StemDirection>,
    #[serde(skip)]
    pub groups: Vec<Range<usize>>,
    pub beams: Vec<BeamLayout>,
    pub tuplets: Vec<TupletBracket>,
    pub ties: Vec<CurveLayout>,
    pub curves: Vec<CurveLayout>,
    #[serde(skip)]
    pub geometry: Vec<NoteGeometry>,
    #[serde(skip)]
    pub display_list: DisplayList,
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

/// Reject malformed input before anything is laid out.
pub fn validate_measure(stave: &StaveSpec, measure: &MeasureSpec) -> Result<(), ConfigError> {
    let len = measure.notes.len();

    for (i, note) in measure.notes.iter().enumerate() {
        let heads = note.pitches.len();
        if heads == 0 {
            return Err(ConfigError::EmptyChord(i));
        }
        if note.dots > MAX_DOTS {
            return Err(ConfigError::TooManyDots { dots: note.dots.into(), max: MAX_DOTS });
        }
        let mut written = note.pitches.iter().chain(note.grace_notes.iter().map(|g| &g.pitch));
        if let Some(p) = written.find(|p| !OCTAVE_RANGE.contains(&p.octave)) {
            return Err(ConfigError::OctaveOutOfRange {
                note: i,
                octave: p.octave,
                min: *OCTAVE_RANGE.start(),
                max: *OCTAVE_RANGE.end(),
            });
        }
        if let Some(slot) = note
            .accidentals
            .iter()
            .enumerate()
            .skip(heads)
            .find_map(|(slot, a)| a.map(|_| slot))
        {
            return Err(ConfigError::HeadSlotOutOfRange { note: i, slot, heads });
        }
    }

    for tuplet in &measure.tuplets {
        tuplets::validate_tuplet(tuplet, len)?;
    }
    for tie in &measure.ties {
        slurs::validate_tie(tie, &measure.notes)?;
    }
    for curve in &measure.curves {
        slurs::validate_curve(curve, len)?;
    }

    for rule in &measure.beam_groups {
        if rule.count == 0 || rule.unit.is_zero() || rule.span().is_none() {
            return Err(ConfigError::InvalidBeamRule {
                count: rule.count,
                unit: rule.unit.denom() as u32,
            });
        }
    }
    if let Some(time) = stave.time_signature {
        TimeSignature::new(time.numerator, time.denominator)?;
        if !measure.beam_groups.is_empty() {
            beams::validate_scheme(&measure.beam_groups, &time)?;
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Layout pass
// ═══════════════════════════════════════════════════════════════════════

/// Lay out and record one measure. Fails without drawing anything.
pub fn layout_measure(
    stave_spec: &StaveSpec,
    measure: &MeasureSpec,
    metrics: &dyn GlyphMetrics,
) -> Result<MeasureLayout, RenderError> {
    validate_measure(stave_spec, measure)?;

    let stave = StaveLayout::new(stave_spec, metrics)?;
    let notes = &measure.notes;
    let clef = stave.clef;

    let durations = effective_durations(notes, &measure.tuplets)?;
    if let Some(time) = stave_spec.time_signature {
        let total = Duration::checked_sum(durations.iter().copied()).ok_or(ConfigError::DurationOverflow)?;
        if total > time.capacity() {
            log::warn!("measure holds {} but the time signature allows {}", total, time.capacity());
        }
    }

    let grouping = group_beams(notes, &durations, &measure.beam_groups, clef)?;
    let stems: Vec<StemDirection> = notes
        .iter()
        .enumerate()
        .map(|(i, n)| match grouping.beam_of(i) {
            Some(beam) => beam.stem,
            None => notes::default_stem(n, clef),
        })
        .collect();

    let extents: Vec<GlyphExtents> = notes
        .iter()
        .zip(&stems)
        .enumerate()
        .map(|(i, (n, &stem))| notes::glyph_extents(n, stem, grouping.beam_of(i).is_some(), clef, metrics))
        .collect();

    let positions = format_notes(&extents, &durations, stave.note_start_x, stave.drawable_width())?;

    let mut geometry: Vec<NoteGeometry> = notes
        .iter()
        .zip(&positions)
        .zip(&stems)
        .map(|((n, p), &stem)| notes::note_geometry(n, p, &stave, stem))
        .collect();

    let beam_layouts: Vec<BeamLayout> = grouping
        .beams
        .iter()
        .map(|b| beams::layout_beam(b, notes, &geometry))
        .collect();
    for layout in &beam_layouts {
        for i in layout.beam.range() {
            if let Some(tip) = layout.tip_of(i) {
                geometry[i].set_beam_tip(tip);
            }
        }
    }

    let brackets: Vec<TupletBracket> = measure
        .tuplets
        .iter()
        .map(|t| tuplets::layout_tuplet(t, &positions, &geometry, &stave))
        .collect();

    let ties = measure
        .ties
        .iter()
        .map(|t| {
            let first = &geometry[t.index];
            let last = &geometry[t.index + 1];
            let start = first.head_anchor(t.first_slot).ok_or(ConfigError::HeadSlotOutOfRange {
                note: t.index,
                slot: t.first_slot,
                heads: first.heads.len(),
            })?;
            let end = last.head_anchor(t.last_slot).ok_or(ConfigError::HeadSlotOutOfRange {
                note: t.index + 1,
                slot: t.last_slot,
                heads: last.heads.len(),
            })?;
            Ok(slurs::route_tie(t.index, start, end, first))
        })
        .collect::<Result<Vec<CurveLayout>, ConfigError>>()?;

    let curves: Vec<CurveLayout> = measure
        .curves
        .iter()
        .map(|c| slurs::route_curve(c, &geometry[c.from], &geometry[c.to]))
        .collect();

    let mut out = DisplayList::new();
    stave.draw(&mut out, metrics);
    for ((note, g), p) in notes.iter().zip(&geometry).zip(&positions) {
        notes::draw_note(&mut out, note, g, p, &stave, metrics);
    }
    for b in &beam_layouts {
        beams::draw_beam(&mut out, b);
    }
    for t in &ties {
        slurs::draw_curve(&mut out, t);
    }
    for b in &brackets {
        tuplets::draw_tuplet(&mut out, b);
    }
    for c in &curves {
        slurs::draw_curve(&mut out, c);
    }

    log::debug!(
        "measure laid out: {} notes, {} beams, {} tuplets, {} ties, {} curves, {} draw commands",
        notes.len(),
        beam_layouts.len(),
        brackets.len(),
        ties.len(),
        curves.len(),
        out.len()
    );

    Ok(MeasureLayout {
        stave_width: stave.width(),
        note_start_x: stave.note_start_x,
        note_end_x: stave.note_end_x,
        stave,
        positions,
        stems,
        groups: grouping.groups,
        beams: beam_layouts,
        tuplets: brackets,
        ties,
        curves,
        geometry,
        display_list: out,
    })
}

/// Lay out one measure and draw it onto `surface`. On a configuration or
/// overflow error the surface is left untouched.
pub fn render_measure<S: RenderSurface + ?Sized>(
    surface: &mut S,
    stave: &StaveSpec,
    measure: &MeasureSpec,
    metrics: &dyn GlyphMetrics,
) -> Result<MeasureLayout, RenderError> {
    let layout = layout_measure(stave, measure, metrics)?;
    layout.display_list.replay(surface)?;
    Ok(layout)
}
