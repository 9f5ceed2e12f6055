//! Request parser: converts the caller's JSON records into the data model.
//!
//! The records mirror what a host application sends for each bar: a stave
//! box, optional furniture (key, clef, time, tempo, repeats, volta), the
//! beam scheme, slurs, and the note list with tuplets and ties. Note keys use
//! the `letter[accidental]/octave` form (`"c#/4"`) and durations the short
//! tokens `w h q 8 16 32 64` with `d` for each dot and a trailing `r` for a
//! rest.

use serde::Deserialize;

use crate::error::{ConfigError, RenderError};
use crate::model::*;
use crate::renderer::SurfaceConfig;

// ═══════════════════════════════════════════════════════════════════════
// Wire records
// ═══════════════════════════════════════════════════════════════════════

/// A whole render request: one surface, any number of bars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(default)]
    pub surface: SurfaceConfig,
    pub bars: Vec<BarRequest>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarRequest {
    pub stave: StaveRecord,
    #[serde(default)]
    pub key_signature: Option<String>,
    #[serde(default)]
    pub key_change: Option<String>,
    #[serde(default)]
    pub clef: Option<String>,
    #[serde(default)]
    pub time_signature: Option<TimeSignatureRecord>,
    #[serde(default)]
    pub tempo: Option<TempoRecord>,
    #[serde(default)]
    pub repeat: Option<String>,
    #[serde(default)]
    pub volta: Option<VoltaRecord>,
    #[serde(default)]
    pub beam_groups: Vec<BeamGroupRecord>,
    #[serde(default)]
    pub vex_curves: Vec<CurveRecord>,
    #[serde(default)]
    pub music_spec: MusicSpecRecord,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaveRecord {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    #[serde(default = "default_true")]
    pub has_right_bar: bool,
    #[serde(default)]
    pub has_double_right_bar: bool,
    pub bar_no: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TimeSignatureRecord {
    pub numerator: u32,
    pub denominator: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TempoRecord {
    pub duration: String,
    #[serde(default)]
    pub dots: u8,
    pub bpm: u32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltaRecord {
    pub volta_type: u8,
    pub iteration: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamGroupRecord {
    pub note_count: u32,
    pub note_kind: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CurveRecord {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicSpecRecord {
    pub note_specs: Vec<NoteSpecRecord>,
    pub tuplets: Vec<TupletRecord>,
    /// Each index ties that note to the next one.
    pub ties: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSpecRecord {
    pub vex_note: VexNoteRecord,
    #[serde(default)]
    pub accidentals: Vec<Option<String>>,
    #[serde(default)]
    pub dots: Vec<u8>,
    #[serde(default)]
    pub ornaments: Vec<String>,
    #[serde(default)]
    pub articulations: Vec<String>,
    #[serde(default)]
    pub grace_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VexNoteRecord {
    pub keys: Vec<String>,
    pub duration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TupletRecord {
    pub start_pos: usize,
    pub end_pos: usize,
    /// Notes played.
    pub p: u32,
    /// In the time of.
    pub q: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════════════════

/// Parse a note key such as `"c/4"`, `"F#/5"` or `"bb/3"`.
pub fn parse_key(token: &str) -> Result<Pitch, ConfigError> {
    let invalid = || ConfigError::InvalidKey(token.to_string());
    let (name, octave) = token.split_once('/').ok_or_else(invalid)?;
    let mut chars = name.trim().chars();
    let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
    let rest = chars.as_str();
    let accidental = if rest.is_empty() {
        None
    } else {
        Some(Accidental::from_token(&rest.to_ascii_lowercase()).ok_or_else(invalid)?)
    };
    let octave: i32 = octave.trim().parse().map_err(|_| invalid())?;
    if !OCTAVE_RANGE.contains(&octave) {
        return Err(invalid());
    }
    Ok(Pitch { letter, accidental, octave })
}

/// Parsed duration token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationToken {
    pub value: NoteValue,
    pub dots: u8,
    pub rest: bool,
}

/// Parse `"q"`, `"8"`, `"hd"`, `"16r"`, `"qddr"` and friends.
pub fn parse_duration(token: &str) -> Result<DurationToken, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(token.to_string());
    let trimmed = token.trim();
    let (body, rest) = match trimmed.strip_suffix('r') {
        Some(b) => (b, true),
        None => (trimmed, false),
    };
    let base = body.trim_end_matches('d');
    let dots = checked_dots(body.len() - base.len())?;

    let value = match base {
        "w" => NoteValue::Whole,
        "h" => NoteValue::Half,
        "q" => NoteValue::Quarter,
        digits => digits
            .parse::<u32>()
            .ok()
            .and_then(NoteValue::from_denominator)
            .ok_or_else(invalid)?,
    };
    Ok(DurationToken { value, dots, rest })
}

fn checked_dots(dots: usize) -> Result<u8, ConfigError> {
    if dots > usize::from(MAX_DOTS) {
        return Err(ConfigError::TooManyDots { dots, max: MAX_DOTS });
    }
    Ok(dots as u8)
}

fn parse_accidental(token: &str) -> Result<Accidental, ConfigError> {
    Accidental::from_token(token).ok_or_else(|| ConfigError::InvalidAccidental(token.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════
// Records to model
// ═══════════════════════════════════════════════════════════════════════

pub fn parse_note(record: &NoteSpecRecord) -> Result<NoteEvent, ConfigError> {
    let duration = parse_duration(&record.vex_note.duration)?;
    let pitches = record
        .vex_note
        .keys
        .iter()
        .map(|k| parse_key(k))
        .collect::<Result<Vec<_>, _>>()?;

    let mut accidentals = vec![None; pitches.len()];
    for (slot, token) in record.accidentals.iter().enumerate() {
        let parsed = match token.as_deref() {
            None | Some("") => None,
            Some(t) => Some(parse_accidental(t)?),
        };
        match accidentals.get_mut(slot) {
            Some(entry) => *entry = parsed,
            None if parsed.is_some() => accidentals.push(parsed),
            None => {}
        }
    }

    let listed_dots = checked_dots(record.dots.iter().copied().max().map_or(0, usize::from))?;

    Ok(NoteEvent {
        pitches,
        value: duration.value,
        dots: duration.dots.max(listed_dots),
        rest: duration.rest,
        accidentals,
        ornaments: record
            .ornaments
            .iter()
            .map(|o| Ornament::from_name(o))
            .collect::<Result<_, _>>()?,
        articulations: record
            .articulations
            .iter()
            .map(|a| Articulation::from_code(a))
            .collect::<Result<_, _>>()?,
        grace_notes: record
            .grace_keys
            .iter()
            .map(|k| parse_key(k).map(|pitch| GraceNote { pitch }))
            .collect::<Result<_, _>>()?,
    })
}

fn parse_beam_rule(record: &BeamGroupRecord) -> Result<BeamRule, ConfigError> {
    if record.note_count == 0 || record.note_kind == 0 || record.note_kind > i32::MAX as u32 {
        return Err(ConfigError::InvalidBeamRule { count: record.note_count, unit: record.note_kind });
    }
    Ok(BeamRule {
        count: record.note_count,
        unit: Duration::new(1, record.note_kind as i32),
    })
}

fn parse_tempo(record: &TempoRecord) -> Result<Tempo, ConfigError> {
    let duration = parse_duration(&record.duration)?;
    Ok(Tempo {
        value: duration.value,
        dots: duration.dots.max(checked_dots(record.dots.into())?),
        bpm: record.bpm,
        name: record.name.clone().filter(|n| !n.is_empty()),
    })
}

/// Convert one bar record into the stave and measure the renderer takes.
pub fn parse_bar(bar: &BarRequest) -> Result<(StaveSpec, MeasureSpec), ConfigError> {
    let mut stave = StaveSpec::new(bar.stave.x, bar.stave.y, bar.stave.width);
    stave.has_right_bar = bar.stave.has_right_bar;
    stave.has_double_right_bar = bar.stave.has_double_right_bar;
    stave.bar_no = bar.stave.bar_no;
    if let Some(ref name) = bar.clef {
        stave.clef = Clef::from_name(name)?;
    }
    stave.key_signature = bar.key_signature.as_deref().map(KeySignature::parse).transpose()?;
    stave.key_change = bar.key_change.as_deref().map(KeySignature::parse).transpose()?;
    stave.time_signature = bar
        .time_signature
        .map(|t| TimeSignature::new(t.numerator, t.denominator))
        .transpose()?;
    stave.tempo = bar.tempo.as_ref().map(parse_tempo).transpose()?;
    if let Some(ref token) = bar.repeat {
        stave.repeats = RepeatMarks::parse(token)?;
    }
    stave.volta = bar.volta.map(|v| Volta {
        kind: VoltaType::from_code(v.volta_type),
        iteration: v.iteration,
    });

    let spec = &bar.music_spec;
    let measure = MeasureSpec {
        notes: spec.note_specs.iter().map(parse_note).collect::<Result<_, _>>()?,
        tuplets: spec
            .tuplets
            .iter()
            .map(|t| Tuplet { start: t.start_pos, end: t.end_pos, actual: t.p, normal: t.q })
            .collect(),
        ties: spec.ties.iter().map(|&i| Tie::new(i)).collect(),
        curves: bar.vex_curves.iter().map(|c| Curve { from: c.from, to: c.to }).collect(),
        beam_groups: bar.beam_groups.iter().map(parse_beam_rule).collect::<Result<_, _>>()?,
    };

    log::debug!(
        "bar {}: {} notes, {} tuplets, {} ties, {} curves",
        stave.bar_no,
        measure.notes.len(),
        measure.tuplets.len(),
        measure.ties.len(),
        measure.curves.len()
    );
    Ok((stave, measure))
}

/// Parse a JSON request.
pub fn parse_score_request(json: &str) -> Result<ScoreRequest, RenderError> {
    Ok(serde_json::from_str(json)?)
}
