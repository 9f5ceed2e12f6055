//! Stave layout: staff lines, clef, key/time signature, barlines, tempo and
//! volta, plus the horizontal space left over for notes.

use crate::error::{ConfigError, OverflowError, OverflowKind, RenderError};
use crate::model::*;
use super::constants::*;
use super::metrics::GlyphMetrics;
use super::surface::{DisplayList, Glyph, TextAnchor};

const TEMPO_TEXT_SIZE: f64 = 13.0;
const VOLTA_TEXT_SIZE: f64 = 11.0;

/// Resolved geometry of one stave.
#[derive(Debug, Clone, PartialEq)]
pub struct StaveLayout {
    pub x: f64,
    /// y of the top staff line.
    pub y: f64,
    pub width: f64,
    pub clef: Clef,
    pub show_clef: bool,
    pub clef_x: f64,
    pub key: Option<KeySignature>,
    pub key_x: f64,
    pub time: Option<TimeSignature>,
    pub time_x: f64,
    pub begin_barline: BarlineType,
    pub repeat_begin_x: f64,
    pub end_barline: BarlineType,
    pub tempo: Option<Tempo>,
    pub volta: Option<Volta>,
    pub note_start_x: f64,
    pub note_end_x: f64,
}

impl StaveLayout {
    /// Reserve space for the stave furniture. Fails on a non-positive width,
    /// or when the furniture leaves no usable room for notes.
    pub fn new(spec: &StaveSpec, metrics: &dyn GlyphMetrics) -> Result<Self, RenderError> {
        if !(spec.width > 0.0) || !spec.width.is_finite() {
            return Err(ConfigError::NonPositiveWidth(spec.width).into());
        }

        let mut cursor = spec.x + STAVE_LEFT_PADDING;

        let show_clef = spec.is_system_start();
        let clef_x = cursor;
        if show_clef {
            cursor += metrics.width(&Glyph::Clef(spec.clef)) + FURNITURE_GAP;
        }

        let key = spec.displayed_key().filter(|k| k.fifths != 0).cloned();
        let key_x = cursor;
        if let Some(ref k) = key {
            cursor += key_signature_width(k, metrics) + FURNITURE_GAP;
        }

        let time = spec.time_signature;
        let time_x = cursor;
        if let Some(ts) = time {
            cursor += metrics.width(&Glyph::TimeSignature(ts)) + FURNITURE_GAP;
        }

        let begin_barline = spec.begin_barline();
        let repeat_begin_x = cursor;
        if begin_barline == BarlineType::RepeatBegin {
            cursor += REPEAT_BARLINE_WIDTH;
        }

        let end_barline = spec.end_barline();
        let mut note_end_x = spec.x + spec.width - STAVE_RIGHT_PADDING;
        if end_barline == BarlineType::RepeatEnd {
            note_end_x -= REPEAT_BARLINE_WIDTH;
        }

        let layout = StaveLayout {
            x: spec.x,
            y: spec.y,
            width: spec.width,
            clef: spec.clef,
            show_clef,
            clef_x,
            key,
            key_x,
            time,
            time_x,
            begin_barline,
            repeat_begin_x,
            end_barline,
            tempo: spec.tempo.clone(),
            volta: spec.volta.filter(|v| v.kind != VoltaType::None),
            note_start_x: cursor,
            note_end_x,
        };

        if layout.drawable_width() < MIN_DRAWABLE_WIDTH {
            return Err(OverflowError {
                kind: OverflowKind::Furniture,
                required: layout.furniture_width() + MIN_DRAWABLE_WIDTH,
                available: spec.width,
            }
            .into());
        }

        log::debug!(
            "stave at ({:.1}, {:.1}) width {:.1}: notes span {:.1}..{:.1}",
            layout.x, layout.y, layout.width, layout.note_start_x, layout.note_end_x
        );
        Ok(layout)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Width available to the notes.
    pub fn drawable_width(&self) -> f64 {
        self.note_end_x - self.note_start_x
    }

    /// Width taken by everything that is not notes.
    pub fn furniture_width(&self) -> f64 {
        self.width - self.drawable_width()
    }

    pub fn top_line_y(&self) -> f64 {
        self.y
    }

    pub fn bottom_line_y(&self) -> f64 {
        self.y + STAFF_HEIGHT
    }

    pub fn middle_line_y(&self) -> f64 {
        self.y + STAFF_HEIGHT / 2.0
    }

    /// y for a staff position in half-spaces above the bottom line.
    pub fn y_for_position(&self, position: i32) -> f64 {
        self.y + (TOP_LINE_POSITION - position) as f64 * HALF_SPACE
    }

    pub fn y_for_pitch(&self, pitch: &Pitch) -> f64 {
        self.y_for_position(pitch.staff_position(self.clef))
    }

    /// Draw staff lines, furniture, barlines, tempo and volta.
    pub fn draw(&self, out: &mut DisplayList, metrics: &dyn GlyphMetrics) {
        let x_end = self.x + self.width;
        for i in 0..STAFF_LINE_COUNT {
            let y = self.y + i as f64 * STAFF_LINE_SPACING;
            out.line(self.x, y, x_end, y, STAFF_LINE_WIDTH);
        }

        // The opening line is always single; a begin repeat follows the furniture.
        self.draw_single_barline(out, self.x);

        if self.show_clef {
            out.glyph(Glyph::Clef(self.clef), self.clef_x, self.y);
        }
        if let Some(ref key) = self.key {
            self.draw_key_signature(out, key, metrics);
        }
        if let Some(ts) = self.time {
            out.glyph(Glyph::TimeSignature(ts), self.time_x, self.y);
        }
        if self.begin_barline == BarlineType::RepeatBegin {
            self.draw_repeat_begin(out, self.repeat_begin_x);
        }

        match self.end_barline {
            BarlineType::None => {}
            BarlineType::Single | BarlineType::RepeatBegin => self.draw_single_barline(out, x_end),
            BarlineType::Double => {
                self.draw_single_barline(out, x_end - DOUBLE_BARLINE_GAP);
                self.draw_single_barline(out, x_end);
            }
            BarlineType::RepeatEnd => self.draw_repeat_end(out, x_end),
        }

        if let Some(ref tempo) = self.tempo {
            self.draw_tempo(out, tempo, metrics);
        }
        if let Some(volta) = self.volta {
            self.draw_volta(out, volta);
        }
    }

    fn draw_single_barline(&self, out: &mut DisplayList, x: f64) {
        out.line(x, self.top_line_y(), x, self.bottom_line_y(), BARLINE_WIDTH);
    }

    fn draw_repeat_dots(&self, out: &mut DisplayList, x: f64) {
        out.glyph(Glyph::RepeatDot, x, self.y + 1.5 * STAFF_LINE_SPACING);
        out.glyph(Glyph::RepeatDot, x, self.y + 2.5 * STAFF_LINE_SPACING);
    }

    fn draw_repeat_begin(&self, out: &mut DisplayList, x: f64) {
        let thick_x = x + THICK_BARLINE_WIDTH / 2.0;
        out.line(thick_x, self.top_line_y(), thick_x, self.bottom_line_y(), THICK_BARLINE_WIDTH);
        self.draw_single_barline(out, x + 6.0);
        self.draw_repeat_dots(out, x + 9.0);
    }

    fn draw_repeat_end(&self, out: &mut DisplayList, x_end: f64) {
        self.draw_repeat_dots(out, x_end - 9.0 - 2.0 * REPEAT_DOT_RADIUS);
        self.draw_single_barline(out, x_end - 6.0);
        let thick_x = x_end - THICK_BARLINE_WIDTH / 2.0;
        out.line(thick_x, self.top_line_y(), thick_x, self.bottom_line_y(), THICK_BARLINE_WIDTH);
    }

    fn draw_key_signature(&self, out: &mut DisplayList, key: &KeySignature, metrics: &dyn GlyphMetrics) {
        let (kind, positions) = key_signature_positions(key, self.clef);
        let advance = metrics.width(&Glyph::Accidental { kind, grace: false });
        for (i, pos) in positions.into_iter().enumerate() {
            out.glyph(
                Glyph::Accidental { kind, grace: false },
                self.key_x + i as f64 * advance,
                self.y_for_position(pos),
            );
        }
    }

    fn draw_tempo(&self, out: &mut DisplayList, tempo: &Tempo, metrics: &dyn GlyphMetrics) {
        let mut x = self.x + self.width * TEMPO_X_FRACTION + STAVE_LEFT_PADDING;
        let mut y = self.y - TEMPO_Y_OFFSET;
        if self.volta.is_some() {
            y -= VOLTA_Y_OFFSET;
        }

        if let Some(ref name) = tempo.name {
            let label = Glyph::Text { content: name.clone(), size: TEMPO_TEXT_SIZE, anchor: TextAnchor::Start };
            let label_w = metrics.width(&label);
            out.glyph(label, x, y + 4.0);
            x += label_w + 4.0;
        }

        let head = Glyph::Notehead { value: tempo.value, grace: true };
        let head_w = metrics.width(&head);
        out.glyph(head, x, y);
        if tempo.value.has_stem() {
            let stem_x = x + head_w;
            out.line(stem_x, y, stem_x, y - STEM_LENGTH * GRACE_SCALE, STEM_WIDTH);
            if tempo.value.flag_count() > 0 {
                out.glyph(
                    Glyph::Flag { count: tempo.value.flag_count(), stem_up: true, grace: true },
                    stem_x,
                    y - STEM_LENGTH * GRACE_SCALE,
                );
            }
        }
        let mut after = x + head_w + 3.0;
        for _ in 0..tempo.dots {
            out.glyph(Glyph::AugmentationDot, after, y);
            after += DOT_SPACING;
        }
        out.text(after + 2.0, y + 4.0, format!("= {}", tempo.bpm), TEMPO_TEXT_SIZE, TextAnchor::Start);
    }

    fn draw_volta(&self, out: &mut DisplayList, volta: Volta) {
        let line_y = self.y - VOLTA_Y_OFFSET;
        let x1 = self.x;
        let x2 = self.x + self.width;
        out.line(x1, line_y, x2, line_y, BARLINE_WIDTH);
        if volta.kind.has_begin_cap() {
            out.line(x1, line_y, x1, line_y + VOLTA_CAP_HEIGHT, BARLINE_WIDTH);
            out.text(
                x1 + VOLTA_LABEL_INSET,
                line_y + VOLTA_TEXT_SIZE + 1.0,
                volta.iteration.to_string(),
                VOLTA_TEXT_SIZE,
                TextAnchor::Start,
            );
        }
        if volta.kind.has_end_cap() {
            out.line(x2, line_y, x2, line_y + VOLTA_CAP_HEIGHT, BARLINE_WIDTH);
        }
    }
}

/// Width of a key signature's accidentals.
pub(super) fn key_signature_width(key: &KeySignature, metrics: &dyn GlyphMetrics) -> f64 {
    let kind = if key.fifths > 0 { Accidental::Sharp } else { Accidental::Flat };
    key.accidental_count().min(7) as f64 * metrics.width(&Glyph::Accidental { kind, grace: false })
}

/// Accidental kind and staff positions of a key signature.
fn key_signature_positions(key: &KeySignature, clef: Clef) -> (Accidental, Vec<i32>) {
    const SHARPS_TREBLE: [i32; 7] = [8, 5, 9, 6, 3, 7, 4];
    const FLATS_TREBLE: [i32; 7] = [4, 7, 3, 6, 2, 5, 1];
    let shift = match clef {
        Clef::Treble => 0,
        Clef::Bass => -2,
        Clef::Alto => -1,
        Clef::Tenor => 1,
    };
    let (kind, pattern) = if key.fifths > 0 {
        (Accidental::Sharp, SHARPS_TREBLE)
    } else {
        (Accidental::Flat, FLATS_TREBLE)
    };
    let positions = pattern
        .iter()
        .take(key.accidental_count().min(7))
        .map(|&p| {
            let pos = p + shift;
            if pos > TOP_LINE_POSITION + 1 { pos - 7 } else { pos }
        })
        .collect();
    (kind, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::metrics::StandardMetrics;
    use crate::renderer::surface::DrawCommand;

    fn first_stave() -> StaveSpec {
        let mut spec = StaveSpec::new(10.0, 40.0, 400.0);
        spec.bar_no = 0;
        spec.key_signature = Some(KeySignature::parse("D").unwrap());
        spec.time_signature = Some(TimeSignature::new(4, 4).unwrap());
        spec
    }

    #[test]
    fn first_stave_reserves_clef_key_and_time() {
        let m = StandardMetrics;
        let plain = StaveLayout::new(&StaveSpec::new(10.0, 40.0, 400.0), &m).unwrap();
        let first = StaveLayout::new(&first_stave(), &m).unwrap();

        assert!(first.show_clef);
        assert_eq!(first.key.as_ref().map(|k| k.fifths), Some(2));
        assert!(first.drawable_width() < plain.drawable_width());
        assert!(first.note_start_x > first.time_x);
        assert_eq!(first.width(), 400.0);
    }

    #[test]
    fn key_signature_ignored_when_not_first() {
        let mut spec = first_stave();
        spec.bar_no = 3;
        let layout = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        assert!(!layout.show_clef);
        assert!(layout.key.is_none());

        spec.key_change = Some(KeySignature::parse("Eb").unwrap());
        let layout = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        assert!(!layout.show_clef);
        assert_eq!(layout.key.map(|k| k.fifths), Some(-3));
    }

    #[test]
    fn rejects_non_positive_width() {
        let spec = StaveSpec::new(0.0, 0.0, 0.0);
        assert_eq!(
            StaveLayout::new(&spec, &StandardMetrics).unwrap_err(),
            RenderError::Config(ConfigError::NonPositiveWidth(0.0))
        );
    }

    #[test]
    fn reports_furniture_overflow() {
        let mut spec = first_stave();
        spec.width = 60.0;
        match StaveLayout::new(&spec, &StandardMetrics) {
            Err(RenderError::Overflow(o)) => {
                assert_eq!(o.kind, OverflowKind::Furniture);
                assert!(o.required > o.available);
            }
            other => panic!("expected furniture overflow, got {:?}", other),
        }
    }

    #[test]
    fn volta_begin_end_draws_both_caps_and_label() {
        let mut spec = StaveSpec::new(0.0, 50.0, 200.0);
        spec.volta = Some(Volta { kind: VoltaType::from_code(5), iteration: 1 });
        let layout = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        let mut out = DisplayList::new();
        layout.draw(&mut out, &StandardMetrics);

        let bracket_y = 50.0 - VOLTA_Y_OFFSET;
        let caps: Vec<f64> = out
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { from, to, .. } if from.y == bracket_y && from.x == to.x => Some(from.x),
                _ => None,
            })
            .collect();
        assert_eq!(caps, vec![0.0, 200.0]);
        assert_eq!(out.texts(), vec!["1"]);
    }

    #[test]
    fn volta_mid_has_no_caps() {
        let mut spec = StaveSpec::new(0.0, 50.0, 200.0);
        spec.volta = Some(Volta { kind: VoltaType::Mid, iteration: 2 });
        let layout = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        let mut out = DisplayList::new();
        layout.draw(&mut out, &StandardMetrics);
        assert!(out.texts().is_empty());
    }

    #[test]
    fn repeats_shrink_note_area() {
        let mut spec = StaveSpec::new(0.0, 0.0, 300.0);
        let plain = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        spec.repeats = RepeatMarks::parse("both").unwrap();
        let repeated = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        assert_eq!(repeated.begin_barline, BarlineType::RepeatBegin);
        assert_eq!(repeated.end_barline, BarlineType::RepeatEnd);
        assert_eq!(
            plain.drawable_width() - repeated.drawable_width(),
            2.0 * REPEAT_BARLINE_WIDTH
        );
    }

    #[test]
    fn positions_map_to_staff_lines() {
        let layout = StaveLayout::new(&StaveSpec::new(0.0, 100.0, 200.0), &StandardMetrics).unwrap();
        assert_eq!(layout.y_for_position(8), 100.0);
        assert_eq!(layout.y_for_position(4), layout.middle_line_y());
        assert_eq!(layout.y_for_position(0), layout.bottom_line_y());
    }

    #[test]
    fn tempo_marking_draws_bpm_text() {
        let mut spec = StaveSpec::new(0.0, 60.0, 200.0);
        spec.tempo = Some(Tempo { value: NoteValue::Quarter, dots: 0, bpm: 96, name: Some("Allegro".into()) });
        let layout = StaveLayout::new(&spec, &StandardMetrics).unwrap();
        let mut out = DisplayList::new();
        layout.draw(&mut out, &StandardMetrics);
        assert_eq!(out.texts(), vec!["Allegro", "= 96"]);
    }
}
