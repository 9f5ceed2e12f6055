//! Beam grouping and beam geometry.
//!
//! Grouping walks the notes once, accumulating their sounding lengths against
//! the caller's scheme of `(count, unit)` groups. Every scheme group becomes
//! one index range; inside a range, each run of two or more beamable notes
//! gets a beam.

use std::ops::Range;

use serde::Serialize;

use crate::error::ConfigError;
use crate::model::*;
use super::constants::*;
use super::notes::NoteGeometry;
use super::surface::DisplayList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StemDirection {
    Up,
    Down,
}

impl StemDirection {
    pub fn is_up(self) -> bool {
        self == StemDirection::Up
    }

    /// +1 when the stem points down the page (towards larger y).
    pub fn sign(self) -> f64 {
        match self {
            StemDirection::Up => -1.0,
            StemDirection::Down => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Beam {
    pub start: usize,
    pub end: usize,
    pub stem: StemDirection,
}

impl Beam {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeamGrouping {
    /// Consecutive ranges, one per scheme group, covering every note.
    pub groups: Vec<Range<usize>>,
    pub beams: Vec<Beam>,
}

impl BeamGrouping {
    pub fn beam_of(&self, index: usize) -> Option<&Beam> {
        self.beams.iter().find(|b| b.contains(index))
    }
}

/// Pairs of eighths, used when the caller gives no scheme.
pub fn default_scheme() -> Vec<BeamRule> {
    vec![BeamRule::new(2, NoteValue::Eighth)]
}

/// A declared scheme must tile one measure of `time` exactly, either once
/// or by repeating.
pub fn validate_scheme(scheme: &[BeamRule], time: &TimeSignature) -> Result<(), ConfigError> {
    let spans = scheme.iter().map(BeamRule::span).collect::<Option<Vec<_>>>();
    let total = spans.and_then(Duration::checked_sum).ok_or(ConfigError::DurationOverflow)?;
    if !total.tiles(time.capacity()) {
        return Err(ConfigError::BeamSchemeMismatch {
            scheme: total.to_string(),
            capacity: time.capacity().to_string(),
        });
    }
    Ok(())
}

/// Majority rule: stems go down only when most of the beam's pitches sit
/// above the middle line.
fn beam_stem_direction(notes: &[NoteEvent], clef: Clef) -> StemDirection {
    let mut above = 0usize;
    let mut total = 0usize;
    for note in notes {
        for pitch in &note.pitches {
            total += 1;
            if pitch.staff_position(clef) > MIDDLE_LINE_POSITION {
                above += 1;
            }
        }
    }
    if above * 2 > total {
        StemDirection::Down
    } else {
        StemDirection::Up
    }
}

/// Partition `notes` into scheme groups and beam the eligible runs.
/// `durations` are the sounding lengths; the scheme repeats if the notes
/// outlast it.
pub fn group_beams(
    notes: &[NoteEvent],
    durations: &[Duration],
    scheme: &[BeamRule],
    clef: Clef,
) -> Result<BeamGrouping, ConfigError> {
    let mut spans = scheme
        .iter()
        .map(|r| r.span().ok_or(ConfigError::DurationOverflow))
        .filter(|span| !matches!(span, Ok(s) if s.is_zero()))
        .collect::<Result<Vec<Duration>, _>>()?;
    if spans.is_empty() {
        spans = default_scheme().iter().filter_map(BeamRule::span).collect();
    }

    let mut groups = Vec::new();
    let mut group_start = 0;
    let mut elapsed = Duration::zero();
    let mut rule = 0;
    let mut boundary = spans[0];

    for (i, &d) in durations.iter().enumerate().take(notes.len()) {
        elapsed = elapsed.checked_add(d).ok_or(ConfigError::DurationOverflow)?;
        if elapsed >= boundary {
            groups.push(group_start..i + 1);
            group_start = i + 1;
            while elapsed >= boundary {
                rule = (rule + 1) % spans.len();
                if rule == 0 {
                    log::warn!("beam scheme exhausted at note {}, repeating it", i);
                }
                boundary = boundary.checked_add(spans[rule]).ok_or(ConfigError::DurationOverflow)?;
            }
        }
    }
    if group_start < notes.len() {
        groups.push(group_start..notes.len());
    }

    let mut beams = Vec::new();
    for group in &groups {
        let mut run_start = None;
        for i in group.start..=group.end {
            let eligible = i < group.end && notes[i].is_beamable();
            match (eligible, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    if i - start >= 2 {
                        beams.push(Beam {
                            start,
                            end: i,
                            stem: beam_stem_direction(&notes[start..i], clef),
                        });
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
    }

    log::debug!("{} beam group(s), {} beam(s)", groups.len(), beams.len());
    Ok(BeamGrouping { groups, beams })
}

// ═══════════════════════════════════════════════════════════════════════
// Beam geometry
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeamSegment {
    /// 1 for the primary beam, 2 for sixteenths, ...
    pub level: usize,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamLayout {
    pub beam: Beam,
    pub slope: f64,
    /// Stem end y of each note in the beam, in order.
    pub stem_tips: Vec<f64>,
    pub segments: Vec<BeamSegment>,
}

impl BeamLayout {
    pub fn tip_of(&self, index: usize) -> Option<f64> {
        if self.beam.contains(index) {
            self.stem_tips.get(index - self.beam.start).copied()
        } else {
            None
        }
    }
}

/// Slant the beam from the first to the last natural stem end (clamped),
/// then shift it away from the heads until every stem is long enough.
pub fn layout_beam(beam: &Beam, notes: &[NoteEvent], geometry: &[NoteGeometry]) -> BeamLayout {
    let members = &geometry[beam.range()];
    let sign = beam.stem.sign();
    let levels = notes[beam.range()]
        .iter()
        .map(|n| n.value.flag_count())
        .max()
        .unwrap_or(1)
        .max(1);

    let first = &members[0];
    let last = &members[members.len() - 1];
    let dx = last.stem_x - first.stem_x;
    let slope = if dx.abs() > 0.1 {
        ((last.natural_tip_y() - first.natural_tip_y()) / dx).clamp(-MAX_BEAM_SLOPE, MAX_BEAM_SLOPE)
    } else {
        0.0
    };
    let line_y = |x: f64| first.natural_tip_y() + slope * (x - first.stem_x);

    let min_stem = MIN_BEAMED_STEM + (levels - 1) as f64 * (BEAM_THICKNESS + BEAM_SPACING);
    let mut shift = 0.0f64;
    for g in members {
        let nearest_head = g.head_nearest_tip_y();
        let reach = (line_y(g.stem_x) - nearest_head) * sign;
        if reach < min_stem {
            shift = shift.max(min_stem - reach);
        }
    }
    let beam_y = |x: f64| line_y(x) + sign * shift;

    let stem_tips: Vec<f64> = members.iter().map(|g| beam_y(g.stem_x)).collect();

    let mut segments = vec![BeamSegment {
        level: 1,
        x1: first.stem_x,
        y1: beam_y(first.stem_x),
        x2: last.stem_x,
        y2: beam_y(last.stem_x),
    }];

    let count = members.len();
    for level in 2..=levels {
        let offset = -sign * (level - 1) as f64 * (BEAM_THICKNESS + BEAM_SPACING);
        let has_level = |k: usize| notes[beam.start + k].value.flag_count() >= level;
        let mut k = 0;
        while k < count {
            if !has_level(k) {
                k += 1;
                continue;
            }
            let run_start = k;
            while k < count && has_level(k) {
                k += 1;
            }
            let run_end = k - 1;
            let (x1, x2) = if run_end > run_start {
                (members[run_start].stem_x, members[run_end].stem_x)
            } else {
                // Lone note at this level: a stub pointing into the beam.
                let x = members[run_start].stem_x;
                if run_start == count - 1 {
                    (x - BEAM_STUB_LENGTH, x)
                } else {
                    (x, x + BEAM_STUB_LENGTH)
                }
            };
            segments.push(BeamSegment {
                level,
                x1,
                y1: beam_y(x1) + offset,
                x2,
                y2: beam_y(x2) + offset,
            });
        }
    }

    BeamLayout { beam: *beam, slope, stem_tips, segments }
}

/// Draw every segment as a thick line whose outer edge sits on the beam line.
pub fn draw_beam(out: &mut DisplayList, layout: &BeamLayout) {
    let inward = -layout.beam.stem.sign() * BEAM_THICKNESS / 2.0;
    for s in &layout.segments {
        out.line(s.x1, s.y1 + inward, s.x2, s.y2 + inward, BEAM_THICKNESS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pitch(letter: Letter, octave: i32) -> Pitch {
        Pitch::new(letter, octave)
    }

    fn notes(values: &[NoteValue], p: Pitch) -> Vec<NoteEvent> {
        values.iter().map(|&v| NoteEvent::note(p, v)).collect()
    }

    fn durations(notes: &[NoteEvent]) -> Vec<Duration> {
        effective_durations(notes, &[]).unwrap()
    }

    #[test]
    fn eight_eighths_in_one_group() {
        let ns = notes(&[NoteValue::Eighth; 8], pitch(Letter::G, 4));
        let grouping = group_beams(&ns, &durations(&ns), &[BeamRule::new(8, NoteValue::Eighth)], Clef::Treble).unwrap();
        assert_eq!(grouping.groups, vec![0..8]);
        assert_eq!(grouping.beams.len(), 1);
        assert_eq!(grouping.beams[0].range(), 0..8);
    }

    #[test]
    fn quarter_notes_are_never_beamed() {
        let ns = notes(&[NoteValue::Quarter; 4], pitch(Letter::G, 4));
        let grouping = group_beams(&ns, &durations(&ns), &[BeamRule::new(4, NoteValue::Quarter)], Clef::Treble).unwrap();
        assert!(grouping.beams.is_empty());
        assert_eq!(grouping.groups, vec![0..4]);
    }

    #[test]
    fn groups_partition_the_notes() {
        use NoteValue::*;
        let ns = notes(
            &[Eighth, Sixteenth, Sixteenth, Quarter, Eighth, Eighth, Eighth, Sixteenth, Sixteenth],
            pitch(Letter::A, 4),
        );
        let scheme = [BeamRule::new(2, Eighth), BeamRule::new(2, Eighth), BeamRule::new(4, Eighth)];
        let grouping = group_beams(&ns, &durations(&ns), &scheme, Clef::Treble).unwrap();

        let mut next = 0;
        for g in &grouping.groups {
            assert_eq!(g.start, next);
            assert!(g.end > g.start);
            next = g.end;
        }
        assert_eq!(next, ns.len());
        assert_eq!(grouping.groups, vec![0..3, 3..4, 4..9]);
        let ranges: Vec<_> = grouping.beams.iter().map(|b| b.range()).collect();
        assert_eq!(ranges, vec![0..3, 4..9]);
    }

    #[test]
    fn rests_split_beams() {
        let mut ns = notes(&[NoteValue::Eighth; 4], pitch(Letter::G, 4));
        ns[1] = NoteEvent::rest(NoteValue::Eighth);
        let grouping = group_beams(&ns, &durations(&ns), &[BeamRule::new(4, NoteValue::Eighth)], Clef::Treble).unwrap();
        let ranges: Vec<_> = grouping.beams.iter().map(|b| b.range()).collect();
        assert_eq!(ranges, vec![2..4]);
    }

    #[test]
    fn triplets_fill_eighth_pairs() {
        let ns = notes(&[NoteValue::Eighth; 6], pitch(Letter::G, 4));
        let tuplets = [
            Tuplet { start: 0, end: 3, actual: 3, normal: 2 },
            Tuplet { start: 3, end: 6, actual: 3, normal: 2 },
        ];
        let ds = effective_durations(&ns, &tuplets).unwrap();
        let grouping = group_beams(&ns, &ds, &[], Clef::Treble).unwrap();
        assert_eq!(grouping.groups, vec![0..3, 3..6]);
    }

    #[test]
    fn oversized_beam_rule_is_an_error_not_a_panic() {
        let ns = notes(&[NoteValue::Eighth; 2], pitch(Letter::G, 4));
        let rule = BeamRule { count: u32::MAX, unit: Duration::new(1, 1) };
        assert_eq!(
            group_beams(&ns, &durations(&ns), &[rule], Clef::Treble),
            Err(ConfigError::DurationOverflow)
        );

        // A long group that still fits keeps every note together.
        let rule = BeamRule { count: 3_000_000_000, unit: Duration::new(1, 8) };
        let grouping = group_beams(&ns, &durations(&ns), &[rule], Clef::Treble).unwrap();
        assert_eq!(grouping.groups, vec![0..2]);
        let ts = TimeSignature::new(4, 4).unwrap();
        assert!(matches!(
            validate_scheme(&[rule], &ts),
            Err(ConfigError::BeamSchemeMismatch { .. })
        ));
    }

    struct Captured(std::sync::Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Captured {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push((record.level(), record.args().to_string()));
            }
        }
        fn flush(&self) {}
    }

    static CAPTURED: Captured = Captured(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn repeating_the_scheme_is_a_warning() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Trace);

        let ns = notes(&[NoteValue::Eighth; 6], pitch(Letter::G, 4));
        group_beams(&ns, &durations(&ns), &[BeamRule::new(2, NoteValue::Eighth)], Clef::Treble).unwrap();

        let lines = CAPTURED.0.lock().unwrap();
        assert!(lines
            .iter()
            .any(|(level, msg)| *level == log::Level::Warn && msg.starts_with("beam scheme exhausted")));
    }

    #[test]
    fn stems_follow_majority_of_pitches() {
        let high = notes(&[NoteValue::Eighth; 2], pitch(Letter::E, 5));
        let grouping = group_beams(&high, &durations(&high), &[], Clef::Treble).unwrap();
        assert_eq!(grouping.beams[0].stem, StemDirection::Down);

        let low = notes(&[NoteValue::Eighth; 2], pitch(Letter::E, 4));
        let grouping = group_beams(&low, &durations(&low), &[], Clef::Treble).unwrap();
        assert_eq!(grouping.beams[0].stem, StemDirection::Up);

        // Half above, half on the middle line: no majority, stems up.
        let mut mixed = notes(&[NoteValue::Eighth; 2], pitch(Letter::B, 4));
        mixed[0] = NoteEvent::note(pitch(Letter::D, 5), NoteValue::Eighth);
        let grouping = group_beams(&mixed, &durations(&mixed), &[], Clef::Treble).unwrap();
        assert_eq!(grouping.beams[0].stem, StemDirection::Up);
    }

    #[test]
    fn scheme_must_match_time_signature() {
        let ts = TimeSignature::new(3, 4).unwrap();
        assert!(validate_scheme(&[BeamRule::new(6, NoteValue::Eighth)], &ts).is_ok());
        assert!(validate_scheme(&[BeamRule::new(2, NoteValue::Eighth)], &ts).is_ok());
        let err = validate_scheme(&[BeamRule::new(4, NoteValue::Eighth)], &ts).unwrap_err();
        assert_eq!(
            err,
            ConfigError::BeamSchemeMismatch { scheme: "1/2".into(), capacity: "3/4".into() }
        );
    }
}
