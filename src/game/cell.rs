//! Square grid coordinates and the mapping between cells and playfield positions.
//!
//! The playfield uses screen-style axes: the origin is the top-left corner of
//! the play area, x grows to the right and y grows downward, so row 0 is the
//! top row of the grid. Bevy's world is y-up and centred on the camera, use
//! [`playfield_to_world`] and [`world_to_playfield`] to cross over.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<CellCoord>();
    app.register_type::<GridLayout>();
}

/// Width of the play area in pixels.
pub const PLAYFIELD_WIDTH: f32 = 660.0;

/// Height of the play area in pixels.
pub const PLAYFIELD_HEIGHT: f32 = 480.0;

/// A discrete (row, column) address in the grid.
///
/// Signed so that [`GridLayout::nearest_cell`] can report positions that fall
/// outside the grid; use [`GridLayout::contains`] before treating a coordinate
/// as a real cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct CellCoord {
    /// Row index, 0 at the top.
    pub row: i32,
    /// Column index, 0 at the left.
    pub column: i32,
}

impl CellCoord {
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// The four orthogonal neighbors: up, down, left, right.
    pub fn neighbors(&self) -> [CellCoord; 4] {
        [
            CellCoord::new(self.row - 1, self.column),
            CellCoord::new(self.row + 1, self.column),
            CellCoord::new(self.row, self.column - 1),
            CellCoord::new(self.row, self.column + 1),
        ]
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Fixed geometry of the bubble grid.
///
/// Cell positions sit on grid-line intersections:
/// `x = column * cell_size + offset_x`, `y = row * cell_size + offset_y`.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
    pub cell_size: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        // 16 columns of 40px plus two 10px margins span the 660px playfield.
        Self {
            rows: 10,
            columns: 16,
            cell_size: 40.0,
            offset_x: 10.0,
            offset_y: 10.0,
        }
    }
}

impl GridLayout {
    /// Snap a playfield position to the closest cell coordinate.
    ///
    /// Ties round away from zero. No clamping happens here, so the result may
    /// lie outside the grid.
    pub fn nearest_cell(&self, pos: Vec2) -> CellCoord {
        let row = ((pos.y - self.offset_y) / self.cell_size).round() as i32;
        let column = ((pos.x - self.offset_x) / self.cell_size).round() as i32;
        CellCoord { row, column }
    }

    /// Playfield position of a cell.
    pub fn cell_to_position(&self, coord: CellCoord) -> Vec2 {
        Vec2::new(
            coord.column as f32 * self.cell_size + self.offset_x,
            coord.row as f32 * self.cell_size + self.offset_y,
        )
    }

    /// Check if a coordinate names a real cell.
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= 0
            && coord.column >= 0
            && (coord.row as u32) < self.rows
            && (coord.column as u32) < self.columns
    }

    /// Pull an out-of-range coordinate onto the nearest edge cell.
    pub fn clamp(&self, coord: CellCoord) -> CellCoord {
        CellCoord {
            row: coord.row.clamp(0, last_index(self.rows)),
            column: coord.column.clamp(0, last_index(self.columns)),
        }
    }

    /// Total number of cells.
    #[cfg(test)]
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Radius of a bubble that exactly fills one cell.
    pub fn bubble_radius(&self) -> f32 {
        self.cell_size * 0.5
    }

    /// Iterate over every cell in row-major order.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        let rows = i32::try_from(self.rows).unwrap_or(i32::MAX);
        let columns = i32::try_from(self.columns).unwrap_or(i32::MAX);
        (0..rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(row, column)))
    }
}

/// Highest usable index along an axis with `count` cells, saturating at
/// `i32::MAX`. Zero cells yields 0.
fn last_index(count: u32) -> i32 {
    i32::try_from(count.saturating_sub(1)).unwrap_or(i32::MAX)
}

/// Convert a playfield position (y-down, top-left origin) to Bevy world space.
pub fn playfield_to_world(pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x - PLAYFIELD_WIDTH * 0.5,
        PLAYFIELD_HEIGHT * 0.5 - pos.y,
    )
}

/// Convert a Bevy world position to playfield space.
pub fn world_to_playfield(pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x + PLAYFIELD_WIDTH * 0.5,
        PLAYFIELD_HEIGHT * 0.5 - pos.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_are_orthogonal() {
        let coord = CellCoord::new(2, 4);
        assert_eq!(
            coord.neighbors(),
            [
                CellCoord::new(1, 4),
                CellCoord::new(3, 4),
                CellCoord::new(2, 3),
                CellCoord::new(2, 5),
            ]
        );
    }

    #[test]
    fn test_position_roundtrip_every_cell() {
        let layout = GridLayout::default();
        for coord in layout.iter() {
            let pos = layout.cell_to_position(coord);
            assert_eq!(layout.nearest_cell(pos), coord);
        }
        assert_eq!(layout.iter().count(), layout.cell_count());
    }

    #[test]
    fn test_cell_to_position_matches_formula() {
        let layout = GridLayout::default();
        let pos = layout.cell_to_position(CellCoord::new(2, 3));
        assert_eq!(pos, Vec2::new(3.0 * 40.0 + 10.0, 2.0 * 40.0 + 10.0));
    }

    #[test]
    fn test_nearest_cell_rounds_to_closest() {
        let layout = GridLayout::default();
        // 3.725 columns and 2.275 rows from the origin.
        assert_eq!(layout.nearest_cell(Vec2::new(159.0, 101.0)), CellCoord::new(2, 4));
    }

    #[test]
    fn test_nearest_cell_ties_round_away_from_zero() {
        let layout = GridLayout::default();
        // Exactly halfway between rows 2 and 3, and between columns 0 and -1.
        let cell = layout.nearest_cell(Vec2::new(-10.0, 110.0));
        assert_eq!(cell, CellCoord::new(3, -1));
    }

    #[test]
    fn test_nearest_cell_does_not_clamp() {
        let layout = GridLayout::default();
        let cell = layout.nearest_cell(Vec2::new(2000.0, -200.0));
        assert!(!layout.contains(cell));
        assert_eq!(layout.clamp(cell), CellCoord::new(0, 15));
    }

    #[test]
    fn test_contains_edges() {
        let layout = GridLayout::default();
        assert!(layout.contains(CellCoord::new(0, 0)));
        assert!(layout.contains(CellCoord::new(9, 15)));
        assert!(!layout.contains(CellCoord::new(10, 0)));
        assert!(!layout.contains(CellCoord::new(0, 16)));
        assert!(!layout.contains(CellCoord::new(-1, 0)));
    }

    #[test]
    fn test_clamp_on_oversized_layout_does_not_wrap() {
        let layout = GridLayout {
            rows: 3_000_000_000,
            columns: u32::MAX,
            ..default()
        };
        assert_eq!(
            layout.clamp(CellCoord::new(-5, i32::MAX)),
            CellCoord::new(0, i32::MAX)
        );
    }

    #[test]
    fn test_world_conversion_roundtrip() {
        let pos = Vec2::new(130.0, 90.0);
        let world = playfield_to_world(pos);
        assert_eq!(world, Vec2::new(130.0 - 330.0, 240.0 - 90.0));
        assert_eq!(world_to_playfield(world), pos);
    }
}
