//! Horizontal note formatter. Assigns each note an x position so spacing
//! follows duration, never drops below the glyphs' own width, and fills the
//! stave's drawable width exactly.
//!
//! Each note owns a slot running from its notehead to the next notehead (the
//! last slot runs to the end of the drawable area). The slot floor is the
//! note's own head and right-hand modifiers, a minimum gap, and the next
//! note's left-hand modifiers. Width is shared out in proportion to duration;
//! notes whose share is below their floor are pinned at the floor and the
//! rest is shared again among the others until no share is short.

use serde::Serialize;

use crate::error::{OverflowError, OverflowKind};
use crate::model::Duration;
use super::constants::*;

const EPSILON: f64 = 1e-9;

/// Horizontal extent of one note's glyphs, relative to its notehead.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphExtents {
    /// Accidentals and left-displaced heads, left of the notehead.
    pub left: f64,
    /// Notehead (or rest) width.
    pub head: f64,
    /// Dots, flags and right-displaced heads.
    pub right: f64,
    pub grace_count: usize,
}

impl GlyphExtents {
    fn grace_width(&self) -> f64 {
        if self.grace_count == 0 {
            0.0
        } else {
            self.grace_count as f64 * GRACE_NOTE_SPACING + GRACE_OFFSET
        }
    }

    /// Everything left of the notehead, grace notes included.
    pub fn total_left(&self) -> f64 {
        self.left + self.grace_width()
    }
}

/// Where one note landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotePosition {
    /// Left edge of the notehead.
    pub x: f64,
    pub head_width: f64,
    pub left_extent: f64,
    pub right_extent: f64,
    /// Distance from this notehead to the next one (or to the end).
    pub slot_width: f64,
    /// Notehead x of each grace note, in order.
    pub grace_x: Vec<f64>,
}

impl NotePosition {
    pub fn center_x(&self) -> f64 {
        self.x + self.head_width / 2.0
    }

    pub fn right_x(&self) -> f64 {
        self.x + self.head_width
    }

    /// Rightmost point of the note's glyphs.
    pub fn right_edge(&self) -> f64 {
        self.x + self.head_width + self.right_extent
    }

    /// Leftmost point of the note's glyphs, grace notes included.
    pub fn left_edge(&self) -> f64 {
        self.x - self.left_extent
    }
}

/// Minimum slot width of every note.
fn slot_floors(extents: &[GlyphExtents]) -> Vec<f64> {
    extents
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let own = e.head + e.right;
            match extents.get(i + 1) {
                Some(next) => own + MIN_NOTE_GAP + next.total_left(),
                None => own,
            }
        })
        .collect()
}

/// Share `available` among slots in proportion to `weights`, never giving a
/// slot less than its floor. Requires `sum(floors) <= available`.
fn justify(floors: &[f64], weights: &[f64], available: f64) -> Vec<f64> {
    let n = floors.len();
    let mut pinned = vec![false; n];
    loop {
        let pinned_width: f64 = (0..n).filter(|&i| pinned[i]).map(|i| floors[i]).sum();
        let free_weight: f64 = (0..n).filter(|&i| !pinned[i]).map(|i| weights[i]).sum();
        let free_width = available - pinned_width;

        let mut newly_pinned = false;
        for i in 0..n {
            if !pinned[i] && free_width * weights[i] / free_weight < floors[i] - EPSILON {
                pinned[i] = true;
                newly_pinned = true;
            }
        }

        // Shares of the free slots sum to at least their floors, so at least
        // one slot always stays free.
        if !newly_pinned || pinned.iter().all(|&p| p) {
            return (0..n)
                .map(|i| {
                    if pinned[i] || free_weight <= 0.0 {
                        floors[i]
                    } else {
                        free_width * weights[i] / free_weight
                    }
                })
                .collect();
        }
    }
}

/// Place notes between `start_x` and `start_x + width`.
///
/// `durations` are the sounding (tuplet-adjusted) lengths. Grace notes sit
/// left of their principal's accidentals and take no part in justification.
pub fn format_notes(
    extents: &[GlyphExtents],
    durations: &[Duration],
    start_x: f64,
    width: f64,
) -> Result<Vec<NotePosition>, OverflowError> {
    if extents.is_empty() {
        return Ok(Vec::new());
    }

    let lead = extents[0].total_left();
    let floors = slot_floors(extents);
    let required: f64 = lead + floors.iter().sum::<f64>();
    if required > width + EPSILON {
        return Err(OverflowError { kind: OverflowKind::Notes, required, available: width });
    }

    let weights: Vec<f64> = durations
        .iter()
        .map(|d| d.as_f64().max(EPSILON))
        .collect();
    let slots = justify(&floors, &weights, width - lead);

    let mut positions = Vec::with_capacity(extents.len());
    let mut x = start_x + lead;
    for (e, &slot) in extents.iter().zip(&slots) {
        let grace_x = (0..e.grace_count)
            .map(|k| x - e.left - GRACE_OFFSET - (e.grace_count - k) as f64 * GRACE_NOTE_SPACING)
            .collect();
        log::trace!("note at {:.1}, slot {:.1}", x, slot);
        positions.push(NotePosition {
            x,
            head_width: e.head,
            left_extent: e.total_left(),
            right_extent: e.right,
            slot_width: slot,
            grace_x,
        });
        x += slot;
    }

    log::debug!("formatted {} notes over {:.1} units", positions.len(), width);
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(head: f64) -> GlyphExtents {
        GlyphExtents { head, ..Default::default() }
    }

    fn quarters(n: usize) -> Vec<Duration> {
        vec![Duration::quarter(); n]
    }

    #[test]
    fn equal_durations_are_evenly_spaced() {
        let extents = vec![plain(NOTEHEAD_WIDTH); 4];
        let positions = format_notes(&extents, &quarters(4), 100.0, 320.0).unwrap();
        let xs: Vec<f64> = positions.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![100.0, 180.0, 260.0, 340.0]);
        assert!(positions.iter().all(|p| p.slot_width == 80.0));
    }

    #[test]
    fn longer_notes_get_more_room() {
        let extents = vec![plain(NOTEHEAD_WIDTH); 3];
        let durations = vec![Duration::new(1, 2), Duration::quarter(), Duration::quarter()];
        let positions = format_notes(&extents, &durations, 0.0, 400.0).unwrap();
        assert_eq!(positions[0].slot_width, 200.0);
        assert_eq!(positions[1].slot_width, 100.0);
    }

    #[test]
    fn short_notes_keep_their_floor_and_fill_width() {
        let mut extents = vec![plain(NOTEHEAD_WIDTH); 9];
        extents[1].right = 8.0; // a flag
        let mut durations = vec![Duration::new(1, 64); 8];
        durations.insert(0, Duration::new(7, 8));
        let width = 300.0;
        let positions = format_notes(&extents, &durations, 0.0, width).unwrap();

        let floors = slot_floors(&extents);
        for (p, floor) in positions.iter().zip(&floors) {
            assert!(p.slot_width >= floor - 1e-6, "slot {} below floor {}", p.slot_width, floor);
        }
        let total: f64 = positions.iter().map(|p| p.slot_width).sum();
        assert!((total - width).abs() < 1e-6);
        assert!(positions[0].slot_width > positions[1].slot_width);
    }

    #[test]
    fn last_note_stays_inside_width() {
        let mut extents = vec![plain(NOTEHEAD_WIDTH); 5];
        extents[4].right = 10.0;
        let positions = format_notes(&extents, &quarters(5), 20.0, 150.0).unwrap();
        let last = positions.last().unwrap();
        assert!(last.right_edge() <= 20.0 + 150.0 + 1e-9);
    }

    #[test]
    fn overflow_is_reported() {
        let extents = vec![plain(NOTEHEAD_WIDTH); 10];
        let err = format_notes(&extents, &quarters(10), 0.0, 100.0).unwrap_err();
        assert_eq!(err.kind, OverflowKind::Notes);
        assert_eq!(err.available, 100.0);
        assert!(err.required > 100.0);
    }

    #[test]
    fn formatting_is_idempotent() {
        let mut extents = vec![plain(NOTEHEAD_WIDTH); 6];
        extents[2].left = 9.0;
        extents[3].grace_count = 2;
        let durations = vec![
            Duration::new(1, 8),
            Duration::new(1, 12),
            Duration::new(1, 12),
            Duration::new(1, 12),
            Duration::new(3, 8),
            Duration::quarter(),
        ];
        let a = format_notes(&extents, &durations, 40.0, 260.0).unwrap();
        let b = format_notes(&extents, &durations, 40.0, 260.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn grace_notes_sit_left_of_principal() {
        let mut extents = vec![plain(NOTEHEAD_WIDTH); 2];
        extents[1].grace_count = 2;
        extents[1].left = 9.0;
        let positions = format_notes(&extents, &quarters(2), 0.0, 200.0).unwrap();
        let p = &positions[1];
        assert_eq!(p.grace_x.len(), 2);
        assert!(p.grace_x[0] < p.grace_x[1]);
        assert_eq!(p.grace_x[1], p.x - 9.0 - GRACE_OFFSET - GRACE_NOTE_SPACING);
        assert!(p.grace_x[0] > positions[0].right_edge());
    }

    #[test]
    fn empty_measure_has_no_positions() {
        assert!(format_notes(&[], &[], 0.0, 100.0).unwrap().is_empty());
    }
}
