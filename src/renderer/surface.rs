//! Render surface contract and the display list that layout draws into.
//!
//! Layout never talks to a real surface directly: every pass records into a
//! [`DisplayList`] and only a fully successful pass is replayed onto the
//! caller's surface.

use serde::Serialize;

use crate::error::SurfaceError;
use crate::model::{Accidental, Articulation, Clef, NoteValue, Ornament, TimeSignature};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bezier {
    pub start: Point,
    pub cp1: Point,
    pub cp2: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// Everything drawn that is not a plain line or curve.
///
/// A glyph is placed by its left edge and vertical centre, except `Clef` and
/// `TimeSignature` (placed at the staff top) and `Text` (baseline, per anchor).
#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    Notehead { value: NoteValue, grace: bool },
    Rest(NoteValue),
    Accidental { kind: Accidental, grace: bool },
    Clef(Clef),
    Flag { count: usize, stem_up: bool, grace: bool },
    AugmentationDot,
    RepeatDot,
    Ornament(Ornament),
    Articulation(Articulation),
    /// Stacked numerator over denominator, centred on the staff.
    TimeSignature(TimeSignature),
    Text { content: String, size: f64, anchor: TextAnchor },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line { from: Point, to: Point, width: f64 },
    Curve { curve: Bezier, thickness: f64 },
    Glyph { glyph: Glyph, at: Point },
}

/// A drawing backend. All calls are synchronous and operate on one shared
/// surface; callers must not run two render passes against it at once.
pub trait RenderSurface {
    fn draw_line(&mut self, from: Point, to: Point, width: f64) -> Result<(), SurfaceError>;
    fn draw_curve(&mut self, curve: &Bezier, thickness: f64) -> Result<(), SurfaceError>;
    fn draw_glyph(&mut self, glyph: &Glyph, at: Point) -> Result<(), SurfaceError>;
    fn clear(&mut self) -> Result<(), SurfaceError>;
}

/// Recorded draw commands, in drawing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64) {
        self.commands.push(DrawCommand::Line {
            from: Point::new(x1, y1),
            to: Point::new(x2, y2),
            width,
        });
    }

    pub fn curve(&mut self, curve: Bezier, thickness: f64) {
        self.commands.push(DrawCommand::Curve { curve, thickness });
    }

    pub fn glyph(&mut self, glyph: Glyph, x: f64, y: f64) {
        self.commands.push(DrawCommand::Glyph { glyph, at: Point::new(x, y) });
    }

    pub fn text(&mut self, x: f64, y: f64, content: impl Into<String>, size: f64, anchor: TextAnchor) {
        self.glyph(Glyph::Text { content: content.into(), size, anchor }, x, y);
    }

    /// Text labels drawn, in order. Handy for inspecting a pass.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Glyph { glyph: Glyph::Text { content, .. }, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Send every recorded command to `surface`, stopping at the first failure.
    pub fn replay<S: RenderSurface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        for command in &self.commands {
            match command {
                DrawCommand::Line { from, to, width } => surface.draw_line(*from, *to, *width)?,
                DrawCommand::Curve { curve, thickness } => surface.draw_curve(curve, *thickness)?,
                DrawCommand::Glyph { glyph, at } => surface.draw_glyph(glyph, *at)?,
            }
        }
        Ok(())
    }
}

impl RenderSurface for DisplayList {
    fn draw_line(&mut self, from: Point, to: Point, width: f64) -> Result<(), SurfaceError> {
        self.commands.push(DrawCommand::Line { from, to, width });
        Ok(())
    }

    fn draw_curve(&mut self, curve: &Bezier, thickness: f64) -> Result<(), SurfaceError> {
        self.commands.push(DrawCommand::Curve { curve: *curve, thickness });
        Ok(())
    }

    fn draw_glyph(&mut self, glyph: &Glyph, at: Point) -> Result<(), SurfaceError> {
        self.commands.push(DrawCommand::Glyph { glyph: glyph.clone(), at });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.commands.clear();
        Ok(())
    }
}
