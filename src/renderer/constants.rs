//! Shared constants for the stave renderer (all in surface user units).

// ── Staff dimensions ────────────────────────────────────────────────
pub(super) const STAFF_LINE_SPACING: f64 = 10.0; // distance between staff lines
pub(super) const HALF_SPACE: f64 = STAFF_LINE_SPACING / 2.0;
pub(super) const STAFF_LINE_COUNT: usize = 5;
pub(super) const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces
pub(super) const MIDDLE_LINE_POSITION: i32 = 4; // half-spaces above the bottom line
pub(super) const TOP_LINE_POSITION: i32 = 8;

// ── Stave furniture ─────────────────────────────────────────────────
pub(super) const STAVE_LEFT_PADDING: f64 = 5.0;
pub(super) const STAVE_RIGHT_PADDING: f64 = 10.0;
pub(super) const FURNITURE_GAP: f64 = 6.0; // gap after each of clef, key, time
pub(super) const MIN_DRAWABLE_WIDTH: f64 = 10.0;
pub(super) const REPEAT_BARLINE_WIDTH: f64 = 14.0;
pub(super) const DOUBLE_BARLINE_GAP: f64 = 4.0;
pub(super) const THICK_BARLINE_WIDTH: f64 = 3.0;
pub(super) const REPEAT_DOT_RADIUS: f64 = 2.0;

// ── Volta and tempo ─────────────────────────────────────────────────
pub(super) const VOLTA_Y_OFFSET: f64 = 30.0; // bracket line above the staff top
pub(super) const VOLTA_CAP_HEIGHT: f64 = 15.0;
pub(super) const VOLTA_LABEL_INSET: f64 = 5.0;
pub(super) const TEMPO_X_FRACTION: f64 = 0.0; // of the stave width, from its start
pub(super) const TEMPO_Y_OFFSET: f64 = 20.0;

// ── Note dimensions ─────────────────────────────────────────────────
pub(super) const NOTEHEAD_WIDTH: f64 = 11.0;
pub(super) const WHOLE_NOTEHEAD_WIDTH: f64 = 15.0;
pub(super) const STEM_LENGTH: f64 = 35.0;
pub(super) const STEM_WIDTH: f64 = 1.2;
pub(super) const LEDGER_LINE_EXTEND: f64 = 4.0;
pub(super) const LEDGER_LINE_WIDTH: f64 = 1.0;
pub(super) const STAFF_LINE_WIDTH: f64 = 0.8;
pub(super) const BARLINE_WIDTH: f64 = 1.0;
pub(super) const DOT_SPACING: f64 = 5.0;
pub(super) const ACCIDENTAL_WIDTH: f64 = 9.0;
pub(super) const ACCIDENTAL_GAP: f64 = 2.0;
pub(super) const MODIFIER_OFFSET: f64 = 8.0; // ornaments/articulations from the note

// ── Beams ───────────────────────────────────────────────────────────
pub(super) const BEAM_THICKNESS: f64 = 4.0;
pub(super) const BEAM_SPACING: f64 = 3.0; // gap between beam levels
pub(super) const BEAM_STUB_LENGTH: f64 = 8.0;
pub(super) const MAX_BEAM_SLOPE: f64 = 0.25;
pub(super) const MIN_BEAMED_STEM: f64 = 20.0;

// ── Spacing ─────────────────────────────────────────────────────────
pub(super) const MIN_NOTE_GAP: f64 = 6.0; // minimum space between adjacent glyph boxes

// ── Grace notes ─────────────────────────────────────────────────────
pub(super) const GRACE_SCALE: f64 = 0.66;
pub(super) const GRACE_NOTE_SPACING: f64 = 8.0;
pub(super) const GRACE_OFFSET: f64 = 4.0; // gap between the last grace note and its principal

// ── Tuplets ─────────────────────────────────────────────────────────
pub(super) const TUPLET_OFFSET: f64 = 10.0; // bracket distance from stems/heads
pub(super) const TUPLET_HOOK: f64 = 5.0;
pub(super) const TUPLET_MIN_WIDTH: f64 = 14.0;
pub(super) const TUPLET_LABEL_GAP: f64 = 10.0;
pub(super) const TUPLET_LINE_WIDTH: f64 = 1.0;

// ── Ties and curves ─────────────────────────────────────────────────
pub(super) const TIE_HEIGHT: f64 = 8.0;
pub(super) const TIE_Y_SHIFT: f64 = 5.0;
pub(super) const TIE_X_GAP: f64 = 2.0;
pub(super) const TIE_THICKNESS: f64 = 1.5;
pub(super) const CURVE_CP1_OFFSET: f64 = 10.0;
pub(super) const CURVE_CP2_OFFSET: f64 = 20.0;
pub(super) const CURVE_Y_SHIFT: f64 = 10.0;
pub(super) const CURVE_THICKNESS: f64 = 2.0;
