//! The occupancy set: which settled bubble sits in which cell.
//!
//! Uses a HashMap keyed by cell so lookups are O(1) - only occupied cells are
//! stored. The layout is fixed when the grid is created.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use super::{
    bubble::BubbleColor,
    cell::{CellCoord, GridLayout},
};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<BubbleGrid>();
}

/// Why a bubble could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell {0} is outside the grid")]
    OutOfBounds(CellCoord),
    #[error("cell {coord} is already occupied by {entity:?}")]
    Occupied { coord: CellCoord, entity: Entity },
    #[error("no free cell left in the grid")]
    GridFull,
}

/// A settled bubble as recorded in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub entity: Entity,
    pub color: BubbleColor,
}

/// The grid resource holding every settled bubble.
#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct BubbleGrid {
    layout: GridLayout,

    /// Map from cell coordinates to the bubble there.
    #[reflect(ignore)]
    cells: HashMap<CellCoord, Occupant>,
}

impl Default for BubbleGrid {
    fn default() -> Self {
        Self::new(GridLayout::default())
    }
}

impl BubbleGrid {
    /// Create an empty grid with a fixed layout.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            cells: HashMap::new(),
        }
    }

    /// The grid geometry. It never changes after creation.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Check if a cell is occupied.
    pub fn is_occupied(&self, coord: CellCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Get the bubble at a cell, if any.
    pub fn get(&self, coord: CellCoord) -> Option<Occupant> {
        self.cells.get(&coord).copied()
    }

    /// Record a settled bubble at a cell.
    ///
    /// Never overwrites: placing a different bubble on an occupied cell is an
    /// error. Placing the same entity on its own cell again is a no-op.
    pub fn place(&mut self, coord: CellCoord, occupant: Occupant) -> Result<(), GridError> {
        if !self.layout.contains(coord) {
            return Err(GridError::OutOfBounds(coord));
        }

        match self.cells.get(&coord) {
            Some(existing) if existing.entity == occupant.entity => Ok(()),
            Some(existing) => Err(GridError::Occupied {
                coord,
                entity: existing.entity,
            }),
            None => {
                self.cells.insert(coord, occupant);
                Ok(())
            }
        }
    }

    /// Remove a bubble from a cell.
    ///
    /// Returns the bubble that was removed, if any.
    pub fn remove(&mut self, coord: CellCoord) -> Option<Occupant> {
        self.cells.remove(&coord)
    }

    /// Get the number of settled bubbles.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all occupied cells.
    pub fn iter(&self) -> impl Iterator<Item = (&CellCoord, &Occupant)> {
        self.cells.iter()
    }

    /// Find the free cell closest to `target`.
    ///
    /// Out-of-range targets are clamped onto the grid first. If that cell is
    /// taken, cells are searched in expanding rings (up, down, left, right
    /// order within a ring) until a free one turns up.
    pub fn free_cell_near(&self, target: CellCoord) -> Result<CellCoord, GridError> {
        let start = self.layout.clamp(target);
        if !self.layout.contains(start) {
            // Only reachable with a zero-sized layout.
            return Err(GridError::GridFull);
        }

        let mut checked = HashSet::new();
        let mut to_check = VecDeque::new();
        checked.insert(start);
        to_check.push_back(start);

        while let Some(coord) = to_check.pop_front() {
            if !self.is_occupied(coord) {
                return Ok(coord);
            }

            for neighbor in coord.neighbors() {
                if self.layout.contains(neighbor) && checked.insert(neighbor) {
                    to_check.push_back(neighbor);
                }
            }
        }

        Err(GridError::GridFull)
    }
}
