//! Sensor-limited knowledge of grid occupancy.
//!
//! Each tick the agent records the occupancy and cost of every cell within
//! its sensor radius. The knowledge map accumulates: cells that fall out of
//! range keep their last sensed value until re-observed.

use std::collections::HashMap;

use crate::core::{GridCoord, Occupancy};
use crate::grid::Grid;

/// The last sensed state of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensedCell {
    /// Occupancy kind at sense time. For traffic-controlled cells the
    /// phase at sense time decides traversability.
    pub occupancy: Occupancy,
    /// Whether the cell was traversable at sense time.
    pub traversable: bool,
    /// Movement cost at sense time.
    pub cost: f32,
}

/// Partial, sensor-limited view of grid occupancy.
///
/// Unsensed cells are optimistically assumed traversable.
#[derive(Clone, Debug, Default)]
pub struct Knowledge {
    cells: HashMap<GridCoord, SensedCell>,
}

impl Knowledge {
    /// Create an empty knowledge map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sensed cell directly.
    pub fn record(&mut self, coord: GridCoord, occupancy: Occupancy, cost: f32) {
        self.cells.insert(
            coord,
            SensedCell {
                occupancy,
                traversable: !occupancy.blocks_movement(),
                cost,
            },
        );
    }

    /// Re-observe every cell within Euclidean `radius` of `center`.
    pub fn refresh(&mut self, grid: &Grid, center: GridCoord, radius: f32) {
        let reach = radius.ceil() as i32;
        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let coord = GridCoord::new(center.row + dr, center.col + dc);
                if center.euclidean_distance(&coord) > radius {
                    continue;
                }
                if let Some(cell) = grid.cell(coord) {
                    self.cells.insert(
                        coord,
                        SensedCell {
                            occupancy: cell.occupancy,
                            traversable: cell.is_traversable(),
                            cost: cell.cost,
                        },
                    );
                }
            }
        }
    }

    /// May a path run through this cell, as far as the sensors know?
    #[inline]
    pub fn allows(&self, coord: GridCoord) -> bool {
        self.cells.get(&coord).map(|c| c.traversable).unwrap_or(true)
    }

    /// The sensed movement cost, if the cell has been observed.
    #[inline]
    pub fn sensed_cost(&self, coord: GridCoord) -> Option<f32> {
        self.cells.get(&coord).map(|c| c.cost)
    }

    /// The sensed state of a cell, if observed.
    #[inline]
    pub fn get(&self, coord: GridCoord) -> Option<&SensedCell> {
        self.cells.get(&coord)
    }

    /// Number of cells ever observed.
    #[inline]
    pub fn observed_count(&self) -> usize {
        self.cells.len()
    }

    /// Forget everything (simulation reset).
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_respects_radius() {
        let grid = Grid::new(11, 10.0);
        let mut knowledge = Knowledge::new();
        let center = GridCoord::new(5, 5);
        knowledge.refresh(&grid, center, 2.0);
        assert!(knowledge.get(GridCoord::new(5, 7)).is_some());
        assert!(knowledge.get(GridCoord::new(5, 8)).is_none());
        // (7, 7) is at distance 2.83, outside a radius of 2
        assert!(knowledge.get(GridCoord::new(7, 7)).is_none());
    }

    #[test]
    fn test_unsensed_optimistic() {
        let knowledge = Knowledge::new();
        assert!(knowledge.allows(GridCoord::new(3, 3)));
        assert_eq!(knowledge.sensed_cost(GridCoord::new(3, 3)), None);
    }

    #[test]
    fn test_sensed_barrier_blocks() {
        let mut grid = Grid::new(5, 10.0);
        grid.place_barrier(GridCoord::new(1, 1)).unwrap();
        let mut knowledge = Knowledge::new();
        knowledge.refresh(&grid, GridCoord::new(0, 0), 3.0);
        assert!(!knowledge.allows(GridCoord::new(1, 1)));
        assert!(knowledge.allows(GridCoord::new(2, 2)));
    }

    #[test]
    fn test_stale_observation_retained_until_reobserved() {
        let mut grid = Grid::new(9, 10.0);
        grid.set_occupancy(GridCoord::new(0, 1), crate::core::Occupancy::Dynamic);
        let mut knowledge = Knowledge::new();
        knowledge.refresh(&grid, GridCoord::new(0, 0), 2.0);
        assert!(!knowledge.allows(GridCoord::new(0, 1)));

        // Obstacle leaves; a far-away refresh does not touch the record.
        grid.set_occupancy(GridCoord::new(0, 1), crate::core::Occupancy::Free);
        knowledge.refresh(&grid, GridCoord::new(8, 8), 1.0);
        assert!(!knowledge.allows(GridCoord::new(0, 1)));

        // Re-observing clears it.
        knowledge.refresh(&grid, GridCoord::new(0, 0), 2.0);
        assert!(knowledge.allows(GridCoord::new(0, 1)));
    }
}
