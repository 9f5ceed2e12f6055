//! Data model for a single measure on a single stave.
//!
//! These types are what the layout engine consumes. They are built fresh for
//! every render call (usually by [`crate::parser`]) and never mutated once
//! layout starts.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use num_rational::{Rational32, Rational64};

use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════════════
// Durations
// ═══════════════════════════════════════════════════════════════════════

/// A note length as an exact fraction of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(Rational32);

impl Duration {
    /// Build `numer / denom` of a whole note. `denom` must be non-zero.
    pub fn new(numer: i32, denom: i32) -> Self {
        Duration(Rational32::new(numer, denom))
    }

    pub fn zero() -> Self {
        Duration(Rational32::from_integer(0))
    }

    pub fn quarter() -> Self {
        Duration::new(1, 4)
    }

    pub fn ratio(self) -> Rational32 {
        self.0
    }

    pub fn numer(self) -> i32 {
        *self.0.numer()
    }

    pub fn denom(self) -> i32 {
        *self.0.denom()
    }

    pub fn is_zero(self) -> bool {
        self.numer() == 0
    }

    pub fn as_f64(self) -> f64 {
        self.numer() as f64 / self.denom() as f64
    }

    /// Exact sum, or `None` when it leaves the 32-bit range.
    pub fn checked_add(self, rhs: Duration) -> Option<Duration> {
        narrow(widen(self.0) + widen(rhs.0))
    }

    /// Multiply by `numer / denom` (tuplet adjustment).
    pub fn checked_scaled(self, numer: u32, denom: u32) -> Option<Duration> {
        if denom == 0 {
            return None;
        }
        narrow(widen(self.0) * Rational64::new(i64::from(numer), i64::from(denom)))
    }

    pub fn checked_times(self, count: u32) -> Option<Duration> {
        narrow(widen(self.0) * Rational64::from_integer(i64::from(count)))
    }

    pub fn checked_sum<I: IntoIterator<Item = Duration>>(items: I) -> Option<Duration> {
        items.into_iter().try_fold(Duration::zero(), Duration::checked_add)
    }

    /// True when a whole number of `self` fills `whole` exactly.
    pub fn tiles(self, whole: Duration) -> bool {
        !self.is_zero() && (widen(whole.0) / widen(self.0)).is_integer()
    }
}

// Products and sums of two 32-bit ratios always fit in 64 bits.
fn widen(r: Rational32) -> Rational64 {
    Rational64::new_raw(i64::from(*r.numer()), i64::from(*r.denom()))
}

fn narrow(r: Rational64) -> Option<Duration> {
    let numer = i32::try_from(*r.numer()).ok()?;
    let denom = i32::try_from(*r.denom()).ok()?;
    Some(Duration(Rational32::new_raw(numer, denom)))
}

impl Default for Duration {
    fn default() -> Self {
        Duration::zero()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer(), self.denom())
    }
}

/// Augmentation dots a note or tempo mark may carry.
pub const MAX_DOTS: u8 = 2;

/// Written note value (the glyph shape), before dots and tuplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl NoteValue {
    /// 1 for a whole note, 2 for a half note, ... 64.
    pub fn denominator(self) -> u32 {
        match self {
            NoteValue::Whole => 1,
            NoteValue::Half => 2,
            NoteValue::Quarter => 4,
            NoteValue::Eighth => 8,
            NoteValue::Sixteenth => 16,
            NoteValue::ThirtySecond => 32,
            NoteValue::SixtyFourth => 64,
        }
    }

    pub fn from_denominator(denom: u32) -> Option<Self> {
        match denom {
            1 => Some(NoteValue::Whole),
            2 => Some(NoteValue::Half),
            4 => Some(NoteValue::Quarter),
            8 => Some(NoteValue::Eighth),
            16 => Some(NoteValue::Sixteenth),
            32 => Some(NoteValue::ThirtySecond),
            64 => Some(NoteValue::SixtyFourth),
            _ => None,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::new(1, self.denominator() as i32)
    }

    /// Number of flags (or beams) the value carries.
    pub fn flag_count(self) -> usize {
        match self {
            NoteValue::Whole | NoteValue::Half | NoteValue::Quarter => 0,
            NoteValue::Eighth => 1,
            NoteValue::Sixteenth => 2,
            NoteValue::ThirtySecond => 3,
            NoteValue::SixtyFourth => 4,
        }
    }

    pub fn is_filled(self) -> bool {
        !matches!(self, NoteValue::Whole | NoteValue::Half)
    }

    pub fn has_stem(self) -> bool {
        self != NoteValue::Whole
    }

    /// Length including `dots` augmentation dots: each dot adds half of the
    /// previous increment. Dots past [`MAX_DOTS`] are ignored.
    pub fn dotted(self, dots: u8) -> Duration {
        let dots = u32::from(dots.min(MAX_DOTS));
        let base = self.duration();
        // base * (2^(dots+1) - 1) / 2^dots
        Duration::new(base.numer() * ((2 << dots) - 1), base.denom() << dots)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Pitch
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// Diatonic step within the octave, C = 0.
    pub fn step(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 1,
            Letter::E => 2,
            Letter::F => 3,
            Letter::G => 4,
            Letter::A => 5,
            Letter::B => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "bb" => Some(Accidental::DoubleFlat),
            "b" => Some(Accidental::Flat),
            "n" => Some(Accidental::Natural),
            "#" => Some(Accidental::Sharp),
            "##" => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
}

impl Default for Clef {
    fn default() -> Self {
        Clef::Treble
    }
}

impl Clef {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "treble" => Ok(Clef::Treble),
            "bass" => Ok(Clef::Bass),
            "alto" => Ok(Clef::Alto),
            "tenor" => Ok(Clef::Tenor),
            other => Err(ConfigError::InvalidClef(other.to_string())),
        }
    }

    /// Diatonic index of the pitch sitting on the bottom staff line.
    fn bottom_line(self) -> i32 {
        match self {
            Clef::Treble => 4 * 7 + Letter::E.step(),
            Clef::Bass => 2 * 7 + Letter::G.step(),
            Clef::Alto => 3 * 7 + Letter::F.step(),
            Clef::Tenor => 3 * 7 + Letter::D.step(),
        }
    }
}

/// Octaves a written pitch may sit in.
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub letter: Letter,
    pub accidental: Option<Accidental>,
    pub octave: i32,
}

impl Pitch {
    pub fn new(letter: Letter, octave: i32) -> Self {
        Self { letter, accidental: None, octave }
    }

    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.letter.step()
    }

    /// Half-space steps above the bottom staff line: 0 is the bottom line,
    /// 4 the middle line, 8 the top line.
    pub fn staff_position(&self, clef: Clef) -> i32 {
        self.diatonic_index() - clef.bottom_line()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Notes
// ═══════════════════════════════════════════════════════════════════════

/// Grace notes always take this written value.
pub const GRACE_NOTE_VALUE: NoteValue = NoteValue::Eighth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceNote {
    pub pitch: Pitch,
}

impl GraceNote {
    pub fn duration(&self) -> Duration {
        GRACE_NOTE_VALUE.duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ornament {
    Trill,
    Mordent,
    InvertedMordent,
    Turn,
    InvertedTurn,
}

impl Ornament {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "tr" => Ok(Ornament::Trill),
            "mordent" => Ok(Ornament::Mordent),
            "mordent_inverted" => Ok(Ornament::InvertedMordent),
            "turn" => Ok(Ornament::Turn),
            "turn_inverted" => Ok(Ornament::InvertedTurn),
            other => Err(ConfigError::UnknownOrnament(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Articulation {
    Staccato,
    Staccatissimo,
    Accent,
    Tenuto,
    Marcato,
    FermataAbove,
    FermataBelow,
}

impl Articulation {
    pub fn from_code(code: &str) -> Result<Self, ConfigError> {
        match code {
            "a." => Ok(Articulation::Staccato),
            "av" => Ok(Articulation::Staccatissimo),
            "a>" => Ok(Articulation::Accent),
            "a-" => Ok(Articulation::Tenuto),
            "a^" => Ok(Articulation::Marcato),
            "a@a" => Ok(Articulation::FermataAbove),
            "a@u" => Ok(Articulation::FermataBelow),
            other => Err(ConfigError::UnknownArticulation(other.to_string())),
        }
    }

    /// Fermatas keep their requested side; the others follow the notehead.
    pub fn fixed_above(self) -> Option<bool> {
        match self {
            Articulation::FermataAbove => Some(true),
            Articulation::FermataBelow => Some(false),
            _ => None,
        }
    }
}

/// One rhythmic event: a single note, a chord, or a rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Chord members in caller order. A rest carries one placement pitch.
    pub pitches: Vec<Pitch>,
    pub value: NoteValue,
    pub dots: u8,
    pub rest: bool,
    /// Displayed accidental per pitch slot.
    pub accidentals: Vec<Option<Accidental>>,
    pub ornaments: Vec<Ornament>,
    pub articulations: Vec<Articulation>,
    pub grace_notes: Vec<GraceNote>,
}

impl NoteEvent {
    pub fn chord(pitches: Vec<Pitch>, value: NoteValue) -> Self {
        let accidentals = vec![None; pitches.len()];
        Self {
            pitches,
            value,
            dots: 0,
            rest: false,
            accidentals,
            ornaments: Vec::new(),
            articulations: Vec::new(),
            grace_notes: Vec::new(),
        }
    }

    pub fn note(pitch: Pitch, value: NoteValue) -> Self {
        Self::chord(vec![pitch], value)
    }

    /// A rest placed on the middle line of a treble stave.
    pub fn rest(value: NoteValue) -> Self {
        Self {
            rest: true,
            ..Self::note(Pitch::new(Letter::B, 4), value)
        }
    }

    pub fn with_dots(mut self, dots: u8) -> Self {
        self.dots = dots;
        self
    }

    /// Nominal length: note value plus dots, before tuplet adjustment.
    pub fn duration(&self) -> Duration {
        self.value.dotted(self.dots)
    }

    /// Rests and notes a quarter or longer are never beamed.
    pub fn is_beamable(&self) -> bool {
        !self.rest && self.duration() < Duration::quarter()
    }
}

/// Largest term accepted on either side of a tuplet ratio.
pub const MAX_TUPLET_RATIO: u32 = 64;

/// `actual` notes in the time of `normal` over `notes[start..end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuplet {
    pub start: usize,
    pub end: usize,
    pub actual: u32,
    pub normal: u32,
}

impl Tuplet {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Tie from `notes[index]` to `notes[index + 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tie {
    pub index: usize,
    pub first_slot: usize,
    pub last_slot: usize,
}

impl Tie {
    pub fn new(index: usize) -> Self {
        Self { index, first_slot: 0, last_slot: 0 }
    }
}

/// Slur between two (not necessarily adjacent) notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Curve {
    pub from: usize,
    pub to: usize,
}

/// `count` units of `unit` length form one beam group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamRule {
    pub count: u32,
    pub unit: Duration,
}

impl BeamRule {
    pub fn new(count: u32, unit: NoteValue) -> Self {
        Self { count, unit: unit.duration() }
    }

    /// `None` when the group is too long to represent exactly.
    pub fn span(&self) -> Option<Duration> {
        self.unit.checked_times(self.count)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Stave furniture
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ConfigError> {
        if numerator == 0
            || !denominator.is_power_of_two()
            || i32::try_from(numerator).is_err()
            || i32::try_from(denominator).is_err()
        {
            return Err(ConfigError::InvalidTimeSignature { numerator, denominator });
        }
        Ok(Self { numerator, denominator })
    }

    /// Length of a full measure.
    pub fn capacity(&self) -> Duration {
        Duration::new(self.numerator as i32, self.denominator as i32)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignature {
    /// Positive for sharps, negative for flats.
    pub fifths: i32,
    pub name: String,
}

impl KeySignature {
    /// Parse a key token such as `"D"`, `"Bb"`, `"F#m"`.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let (tonic, minor) = match token.strip_suffix('m') {
            Some(t) => (t, true),
            None => (token, false),
        };
        const MAJOR: [(&str, i32); 15] = [
            ("Cb", -7), ("Gb", -6), ("Db", -5), ("Ab", -4), ("Eb", -3), ("Bb", -2), ("F", -1),
            ("C", 0), ("G", 1), ("D", 2), ("A", 3), ("E", 4), ("B", 5), ("F#", 6), ("C#", 7),
        ];
        const MINOR: [(&str, i32); 15] = [
            ("Ab", -7), ("Eb", -6), ("Bb", -5), ("F", -4), ("C", -3), ("G", -2), ("D", -1),
            ("A", 0), ("E", 1), ("B", 2), ("F#", 3), ("C#", 4), ("G#", 5), ("D#", 6), ("A#", 7),
        ];
        let table = if minor { &MINOR } else { &MAJOR };
        table
            .iter()
            .find(|(name, _)| *name == tonic)
            .map(|&(_, fifths)| KeySignature { fifths, name: token.to_string() })
            .ok_or_else(|| ConfigError::InvalidKeySignature(token.to_string()))
    }

    pub fn accidental_count(&self) -> usize {
        self.fifths.unsigned_abs() as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tempo {
    pub value: NoteValue,
    pub dots: u8,
    pub bpm: u32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltaType {
    None,
    Begin,
    Mid,
    End,
    BeginEnd,
}

impl VoltaType {
    /// Caller codes: 0 none, 2 begin, 3 mid, 4 end, 5 begin-end. Code 1 is
    /// reserved and, like anything unrecognised, draws no bracket.
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => VoltaType::Begin,
            3 => VoltaType::Mid,
            4 => VoltaType::End,
            5 => VoltaType::BeginEnd,
            0 => VoltaType::None,
            other => {
                log::warn!("volta code {} is reserved or unknown; drawing no volta", other);
                VoltaType::None
            }
        }
    }

    pub fn has_begin_cap(self) -> bool {
        matches!(self, VoltaType::Begin | VoltaType::BeginEnd)
    }

    pub fn has_end_cap(self) -> bool {
        matches!(self, VoltaType::End | VoltaType::BeginEnd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volta {
    pub kind: VoltaType,
    pub iteration: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarlineType {
    None,
    Single,
    Double,
    RepeatBegin,
    RepeatEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepeatMarks {
    pub begin: bool,
    pub end: bool,
}

impl RepeatMarks {
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        match token {
            "begin" => Ok(RepeatMarks { begin: true, end: false }),
            "end" => Ok(RepeatMarks { begin: false, end: true }),
            "both" => Ok(RepeatMarks { begin: true, end: true }),
            other => Err(ConfigError::InvalidRepeat(other.to_string())),
        }
    }
}

/// Everything needed to lay out and draw one stave (one measure).
#[derive(Debug, Clone, PartialEq)]
pub struct StaveSpec {
    pub x: f64,
    /// y of the top staff line.
    pub y: f64,
    pub width: f64,
    pub has_right_bar: bool,
    pub has_double_right_bar: bool,
    /// 0 marks the first stave of a system: clef and key signature are drawn.
    pub bar_no: u32,
    pub clef: Clef,
    pub key_signature: Option<KeySignature>,
    /// Key signature drawn without a clef on a stave that is not first.
    pub key_change: Option<KeySignature>,
    pub time_signature: Option<TimeSignature>,
    pub tempo: Option<Tempo>,
    pub repeats: RepeatMarks,
    pub volta: Option<Volta>,
}

impl StaveSpec {
    pub fn new(x: f64, y: f64, width: f64) -> Self {
        Self {
            x,
            y,
            width,
            has_right_bar: true,
            has_double_right_bar: false,
            bar_no: 1,
            clef: Clef::Treble,
            key_signature: None,
            key_change: None,
            time_signature: None,
            tempo: None,
            repeats: RepeatMarks::default(),
            volta: None,
        }
    }

    pub fn is_system_start(&self) -> bool {
        self.bar_no == 0
    }

    pub fn begin_barline(&self) -> BarlineType {
        if self.repeats.begin {
            BarlineType::RepeatBegin
        } else {
            BarlineType::Single
        }
    }

    /// A requested repeat wins over a doubled bar.
    pub fn end_barline(&self) -> BarlineType {
        if self.repeats.end {
            BarlineType::RepeatEnd
        } else if self.has_double_right_bar {
            BarlineType::Double
        } else if self.has_right_bar {
            BarlineType::Single
        } else {
            BarlineType::None
        }
    }

    /// The key signature this stave draws, if any.
    pub fn displayed_key(&self) -> Option<&KeySignature> {
        if self.is_system_start() {
            self.key_signature.as_ref()
        } else {
            self.key_change.as_ref()
        }
    }
}

/// The music of one measure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasureSpec {
    pub notes: Vec<NoteEvent>,
    pub tuplets: Vec<Tuplet>,
    pub ties: Vec<Tie>,
    pub curves: Vec<Curve>,
    pub beam_groups: Vec<BeamRule>,
}

impl MeasureSpec {
    pub fn new(notes: Vec<NoteEvent>) -> Self {
        Self { notes, ..Default::default() }
    }

    /// Sum of the notes' lengths after tuplet adjustment.
    pub fn total_duration(&self) -> Result<Duration, ConfigError> {
        let durations = effective_durations(&self.notes, &self.tuplets)?;
        Duration::checked_sum(durations).ok_or(ConfigError::DurationOverflow)
    }
}

/// Each note's sounding length, scaled by every tuplet covering it.
/// Ranges are assumed to be validated already; out-of-range ends are clipped.
pub fn effective_durations(notes: &[NoteEvent], tuplets: &[Tuplet]) -> Result<Vec<Duration>, ConfigError> {
    let mut durations: Vec<Duration> = notes.iter().map(NoteEvent::duration).collect();
    for t in tuplets {
        if t.actual == 0 {
            continue;
        }
        let end = t.end.min(durations.len());
        for d in durations.iter_mut().take(end).skip(t.start) {
            *d = d.checked_scaled(t.normal, t.actual).ok_or(ConfigError::DurationOverflow)?;
        }
    }
    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_durations() {
        assert_eq!(NoteValue::Quarter.dotted(0), Duration::new(1, 4));
        assert_eq!(NoteValue::Quarter.dotted(1), Duration::new(3, 8));
        assert_eq!(NoteValue::Half.dotted(2), Duration::new(7, 8));
        assert_eq!(NoteValue::Half.dotted(40), Duration::new(7, 8));
    }

    #[test]
    fn duration_arithmetic_reports_overflow() {
        let near_max = Duration::new(i32::MAX - 1, 1);
        assert_eq!(near_max.checked_add(Duration::new(1, 1)), Some(Duration::new(i32::MAX, 1)));
        assert_eq!(near_max.checked_add(Duration::new(2, 1)), None);
        assert_eq!(Duration::quarter().checked_scaled(2_000_000_011, 2_000_000_033), None);
        assert_eq!(Duration::quarter().checked_scaled(2, 3), Some(Duration::new(1, 6)));
        assert_eq!(Duration::quarter().checked_scaled(1, 0), None);
        assert_eq!(Duration::new(1, 8).checked_times(3_000_000_000), Some(Duration::new(375_000_000, 1)));
        assert_eq!(Duration::new(1, 1).checked_times(u32::MAX), None);
        assert!(Duration::new(1, 4).tiles(Duration::new(3, 4)));
        assert!(!Duration::new(1, 2).tiles(Duration::new(3, 4)));
        assert!(!Duration::zero().tiles(Duration::new(3, 4)));
    }

    #[test]
    fn stacked_tuplets_overflow_as_config_error() {
        let notes = vec![NoteEvent::note(Pitch::new(Letter::C, 5), NoteValue::Eighth); 2];
        let tuplets: Vec<Tuplet> = [61, 59, 53, 47, 43, 41]
            .iter()
            .map(|&p| Tuplet { start: 0, end: 2, actual: p, normal: p - 1 })
            .collect();
        let spec = MeasureSpec { notes, tuplets, ..Default::default() };
        assert_eq!(spec.total_duration(), Err(ConfigError::DurationOverflow));
    }

    #[test]
    fn time_signature_formats_as_slash_string() {
        let ts = TimeSignature::new(3, 4).unwrap();
        assert_eq!(ts.to_string(), "3/4");
        assert_eq!(ts.capacity(), Duration::new(3, 4));
        assert!(TimeSignature::new(3, 5).is_err());
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(3_000_000_000, 4).is_err());
        assert!(TimeSignature::new(3, 1 << 31).is_err());
        assert!(TimeSignature::new(i32::MAX as u32, 64).is_ok());
    }

    #[test]
    fn key_signature_tokens() {
        assert_eq!(KeySignature::parse("D").unwrap().fifths, 2);
        assert_eq!(KeySignature::parse("Bb").unwrap().fifths, -2);
        assert_eq!(KeySignature::parse("F#m").unwrap().fifths, 3);
        assert_eq!(KeySignature::parse("Cb").unwrap().accidental_count(), 7);
        assert!(KeySignature::parse("H").is_err());
    }

    #[test]
    fn staff_positions_follow_clef() {
        let b4 = Pitch::new(Letter::B, 4);
        assert_eq!(b4.staff_position(Clef::Treble), 4);
        let d3 = Pitch::new(Letter::D, 3);
        assert_eq!(d3.staff_position(Clef::Bass), 4);
        let c4 = Pitch::new(Letter::C, 4);
        assert_eq!(c4.staff_position(Clef::Alto), 4);
        assert_eq!(c4.staff_position(Clef::Treble), -2);
    }

    #[test]
    fn volta_codes() {
        assert_eq!(VoltaType::from_code(0), VoltaType::None);
        assert_eq!(VoltaType::from_code(1), VoltaType::None);
        assert_eq!(VoltaType::from_code(2), VoltaType::Begin);
        assert_eq!(VoltaType::from_code(5), VoltaType::BeginEnd);
        assert!(VoltaType::BeginEnd.has_begin_cap() && VoltaType::BeginEnd.has_end_cap());
        assert!(!VoltaType::Mid.has_begin_cap() && !VoltaType::Mid.has_end_cap());
    }

    #[test]
    fn end_barline_repeat_wins_over_double() {
        let mut stave = StaveSpec::new(0.0, 0.0, 200.0);
        stave.has_double_right_bar = true;
        assert_eq!(stave.end_barline(), BarlineType::Double);
        stave.repeats.end = true;
        assert_eq!(stave.end_barline(), BarlineType::RepeatEnd);
        stave.repeats = RepeatMarks::default();
        stave.has_double_right_bar = false;
        stave.has_right_bar = false;
        assert_eq!(stave.end_barline(), BarlineType::None);
    }

    #[test]
    fn triplet_eighths_fill_a_quarter() {
        let c = Pitch::new(Letter::C, 5);
        let mut spec = MeasureSpec::new(vec![NoteEvent::note(c, NoteValue::Eighth); 3]);
        spec.tuplets.push(Tuplet { start: 0, end: 3, actual: 3, normal: 2 });
        assert_eq!(spec.total_duration().unwrap(), Duration::quarter());
    }

    #[test]
    fn beam_eligibility() {
        let c = Pitch::new(Letter::C, 5);
        assert!(NoteEvent::note(c, NoteValue::Eighth).is_beamable());
        assert!(NoteEvent::note(c, NoteValue::Eighth).with_dots(1).is_beamable());
        assert!(!NoteEvent::note(c, NoteValue::Quarter).is_beamable());
        assert!(!NoteEvent::rest(NoteValue::Sixteenth).is_beamable());
    }
}
