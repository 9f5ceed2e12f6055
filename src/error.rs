//! Error types for stave rendering.
//!
//! Three classes of failure are kept apart so callers can react to each:
//! malformed input ([`ConfigError`]), content that does not fit the space it
//! was given ([`OverflowError`]), and failures of the render surface
//! ([`SurfaceError`]). None of them is retried anywhere in the pipeline.

use std::fmt;

use thiserror::Error;

/// Top-level error returned by every render entry point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Malformed stave or measure input; nothing was drawn.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Content exceeds the available width; nothing was drawn.
    #[error("layout overflow: {0}")]
    Overflow(#[from] OverflowError),

    /// The render surface failed; propagated unchanged.
    #[error("render surface failure: {0}")]
    Surface(#[from] SurfaceError),
}

/// Which index-range input a [`ConfigError::InvalidRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Tuplet,
    Tie,
    Curve,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RangeKind::Tuplet => "tuplet",
            RangeKind::Tie => "tie",
            RangeKind::Curve => "curve",
        };
        f.write_str(s)
    }
}

/// Malformed caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("stave width must be positive, got {0}")]
    NonPositiveWidth(f64),

    #[error("invalid {kind} range [{start}, {end}) over {len} notes")]
    InvalidRange {
        kind: RangeKind,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("note {note} has {heads} notehead(s), slot {slot} does not exist")]
    HeadSlotOutOfRange { note: usize, slot: usize, heads: usize },

    #[error("note {0} has no pitches")]
    EmptyChord(usize),

    #[error("malformed note key '{0}'")]
    InvalidKey(String),

    #[error("malformed duration token '{0}'")]
    InvalidDuration(String),

    #[error("{dots} augmentation dots requested, at most {max} are supported")]
    TooManyDots { dots: usize, max: u8 },

    #[error("note {note} is written in octave {octave}, outside {min}..={max}")]
    OctaveOutOfRange { note: usize, octave: i32, min: i32, max: i32 },

    #[error("unknown accidental '{0}'")]
    InvalidAccidental(String),

    #[error("unknown ornament '{0}'")]
    UnknownOrnament(String),

    #[error("unknown articulation '{0}'")]
    UnknownArticulation(String),

    #[error("unknown key signature '{0}'")]
    InvalidKeySignature(String),

    #[error("unknown clef '{0}'")]
    InvalidClef(String),

    #[error("invalid time signature {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u32, denominator: u32 },

    #[error("tuplet ratio {actual}:{normal} must have both terms in 1..={max}")]
    InvalidTupletRatio { actual: u32, normal: u32, max: u32 },

    #[error("invalid beam rule {count} x 1/{unit}")]
    InvalidBeamRule { count: u32, unit: u32 },

    #[error("note lengths overflow exact arithmetic")]
    DurationOverflow,

    #[error("beam scheme spans {scheme} but the time signature holds {capacity}")]
    BeamSchemeMismatch { scheme: String, capacity: String },

    #[error("unknown repeat mark '{0}'")]
    InvalidRepeat(String),

    #[error("malformed request: {0}")]
    Json(String),
}

/// What ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowKind {
    /// Clef, key and time signature, repeat barlines.
    Furniture,
    /// The notes of the measure at their minimum spacing.
    Notes,
}

/// Content wider than the space available for it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind:?} need {required:.1} units but only {available:.1} are available")]
pub struct OverflowError {
    pub kind: OverflowKind,
    pub required: f64,
    pub available: f64,
}

/// Render surface failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("render target id is empty")]
    MissingTarget,

    #[error("surface dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("surface scale must be positive, got {0}")]
    InvalidScale(f64),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::Config(ConfigError::Json(e.to_string()))
    }
}
