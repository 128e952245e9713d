//! Grid storage and mutation.
//!
//! The grid is a fixed R×R flat row-major `Vec<Cell>`. Raw mutators apply
//! no policy; the protected `place_*` operations used by editor collaborators
//! reject conflicting placements with [`PlacementError`] and leave the grid
//! unchanged.

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::core::{Cell, GridCoord, LightPhase, Occupancy, TrafficLight};

/// A rejected cell mutation. The grid is left unchanged; callers may log
/// and ignore.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("coordinate ({},{}) is outside the grid", coord.row, coord.col)]
    OutOfBounds { coord: GridCoord },

    #[error("cell ({},{}) is protected: {occupied:?} occupies it", coord.row, coord.col)]
    Protected {
        coord: GridCoord,
        occupied: Occupancy,
    },

    #[error("cell ({},{}) already carries a goal marker", coord.row, coord.col)]
    GoalMarker { coord: GridCoord },

    #[error("movement cost {cost} for cell ({},{}) is not positive", coord.row, coord.col)]
    InvalidCost { coord: GridCoord, cost: f32 },
}

/// Lazily built traversable-neighbor lists, keyed to a grid revision.
#[derive(Clone, Debug, Default)]
struct NeighborCache {
    revision: u64,
    map: HashMap<GridCoord, Vec<GridCoord>>,
}

/// Fixed-size occupancy grid.
///
/// Goal markers are an overlay on top of occupancy: a goal cell stays
/// `Free` (and traversable) while carrying a priority tag, so the
/// one-kind-per-cell invariant holds for occupancy alone.
#[derive(Clone, Debug)]
pub struct Grid {
    cells: Vec<Cell>,
    rows: usize,
    /// Goal markers in insertion order: (position, priority).
    goals: Vec<(GridCoord, i32)>,
    /// The agent's current cell (starts at the editor-placed start cell).
    agent_pos: Option<GridCoord>,
    /// Traffic light cycle length in simulated seconds.
    cycle_length: f64,
    /// Bumped on every occupancy or light-phase mutation.
    revision: u64,
    neighbor_cache: RefCell<NeighborCache>,
}

impl Grid {
    /// Create an R×R grid of free cells.
    pub fn new(rows: usize, cycle_length: f64) -> Self {
        Self {
            cells: vec![Cell::default(); rows * rows],
            rows,
            goals: Vec::new(),
            agent_pos: None,
            cycle_length,
            revision: 0,
            neighbor_cache: RefCell::new(NeighborCache::default()),
        }
    }

    /// Grid dimension (rows == columns).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Traffic light cycle length in simulated seconds.
    #[inline]
    pub fn cycle_length(&self) -> f64 {
        self.cycle_length
    }

    /// Is the coordinate inside the grid?
    #[inline]
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.rows
            && (coord.col as usize) < self.rows
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> usize {
        coord.row as usize * self.rows + coord.col as usize
    }

    /// The cell at `coord`, if in bounds.
    #[inline]
    pub fn cell(&self, coord: GridCoord) -> Option<&Cell> {
        if self.in_bounds(coord) {
            Some(&self.cells[self.index(coord)])
        } else {
            None
        }
    }

    /// Occupancy kind at `coord`, if in bounds.
    #[inline]
    pub fn occupancy(&self, coord: GridCoord) -> Option<Occupancy> {
        self.cell(coord).map(|c| c.occupancy)
    }

    /// Movement cost at `coord` (1.0 for out-of-bounds queries).
    #[inline]
    pub fn cost(&self, coord: GridCoord) -> f32 {
        self.cell(coord).map(|c| c.cost).unwrap_or(1.0)
    }

    /// Current light phase at `coord`, if it is a traffic-controlled cell.
    #[inline]
    pub fn light_phase(&self, coord: GridCoord) -> Option<LightPhase> {
        self.cell(coord).and_then(|c| c.light).map(|l| l.phase)
    }

    /// Phase start time at `coord`, if it is a traffic-controlled cell.
    #[inline]
    pub fn light_phase_start(&self, coord: GridCoord) -> Option<f64> {
        self.cell(coord).and_then(|c| c.light).map(|l| l.phase_start)
    }

    /// Is the cell traversable at this instant?
    #[inline]
    pub fn is_traversable(&self, coord: GridCoord) -> bool {
        self.cell(coord).map(|c| c.is_traversable()).unwrap_or(false)
    }

    /// The agent's current cell.
    #[inline]
    pub fn start(&self) -> Option<GridCoord> {
        self.agent_pos
    }

    /// Goal markers in insertion order.
    #[inline]
    pub fn goal_markers(&self) -> &[(GridCoord, i32)] {
        &self.goals
    }

    /// Does the cell carry a goal marker?
    #[inline]
    pub fn is_goal(&self, coord: GridCoord) -> bool {
        self.goals.iter().any(|(c, _)| *c == coord)
    }

    // --- Raw mutators (no placement policy) ---

    /// Set occupancy directly. No-op when out of bounds; overwriting a
    /// traffic-controlled cell drops its light.
    pub fn set_occupancy(&mut self, coord: GridCoord, kind: Occupancy) {
        if !self.in_bounds(coord) {
            return;
        }
        let idx = self.index(coord);
        let cell = &mut self.cells[idx];
        cell.occupancy = kind;
        if kind != Occupancy::TrafficLight {
            cell.light = None;
        }
        self.revision += 1;
    }

    /// Reset a cell to its default free state, removing any goal marker and
    /// clearing the start if it sat here.
    pub fn clear(&mut self, coord: GridCoord) {
        if !self.in_bounds(coord) {
            return;
        }
        let idx = self.index(coord);
        self.cells[idx] = Cell::default();
        self.goals.retain(|(c, _)| *c != coord);
        if self.agent_pos == Some(coord) {
            self.agent_pos = None;
        }
        self.revision += 1;
    }

    // --- Protected editor operations ---

    fn ensure_in_bounds(&self, coord: GridCoord) -> Result<(), PlacementError> {
        if self.in_bounds(coord) {
            Ok(())
        } else {
            Err(PlacementError::OutOfBounds { coord })
        }
    }

    fn ensure_unmarked(&self, coord: GridCoord) -> Result<(), PlacementError> {
        if self.is_goal(coord) {
            Err(PlacementError::GoalMarker { coord })
        } else {
            Ok(())
        }
    }

    /// Place a static barrier. Rejected on the start cell, on a dynamic
    /// occupant and on goal-marked cells.
    pub fn place_barrier(&mut self, coord: GridCoord) -> Result<(), PlacementError> {
        self.ensure_in_bounds(coord)?;
        self.ensure_unmarked(coord)?;
        let occupied = self.occupancy(coord).unwrap();
        if matches!(occupied, Occupancy::Start | Occupancy::Dynamic) {
            return Err(PlacementError::Protected { coord, occupied });
        }
        self.set_occupancy(coord, Occupancy::Barrier);
        Ok(())
    }

    /// Place a traffic light whose cycle starts at `phase_start`. Only free,
    /// unmarked cells accept a light.
    pub fn place_traffic_light(
        &mut self,
        coord: GridCoord,
        phase_start: f64,
    ) -> Result<(), PlacementError> {
        self.ensure_in_bounds(coord)?;
        self.ensure_unmarked(coord)?;
        let occupied = self.occupancy(coord).unwrap();
        if occupied != Occupancy::Free {
            return Err(PlacementError::Protected { coord, occupied });
        }
        let idx = self.index(coord);
        self.cells[idx].occupancy = Occupancy::TrafficLight;
        self.cells[idx].light = Some(TrafficLight::new(phase_start));
        self.revision += 1;
        Ok(())
    }

    /// Mark a free cell as a goal with the given priority.
    pub fn place_goal(&mut self, coord: GridCoord, priority: i32) -> Result<(), PlacementError> {
        self.ensure_in_bounds(coord)?;
        self.ensure_unmarked(coord)?;
        let occupied = self.occupancy(coord).unwrap();
        if occupied != Occupancy::Free {
            return Err(PlacementError::Protected { coord, occupied });
        }
        self.goals.push((coord, priority));
        debug!(
            "goal placed at ({},{}) priority {}",
            coord.row, coord.col, priority
        );
        Ok(())
    }

    /// Remove the goal marker at `coord`, if any.
    pub fn remove_goal(&mut self, coord: GridCoord) {
        self.goals.retain(|(c, _)| *c != coord);
    }

    /// Set the agent start cell. Only a free, unmarked cell qualifies; any
    /// previous start cell reverts to free.
    pub fn set_start(&mut self, coord: GridCoord) -> Result<(), PlacementError> {
        self.ensure_in_bounds(coord)?;
        self.ensure_unmarked(coord)?;
        let occupied = self.occupancy(coord).unwrap();
        if occupied != Occupancy::Free {
            return Err(PlacementError::Protected { coord, occupied });
        }
        if let Some(prev) = self.agent_pos.take() {
            if self.occupancy(prev) == Some(Occupancy::Start) {
                self.set_occupancy(prev, Occupancy::Free);
            }
        }
        self.set_occupancy(coord, Occupancy::Start);
        self.agent_pos = Some(coord);
        Ok(())
    }

    /// Clear the start cell, if set.
    pub fn clear_start(&mut self) {
        if let Some(prev) = self.agent_pos.take() {
            if self.occupancy(prev) == Some(Occupancy::Start) {
                self.set_occupancy(prev, Occupancy::Free);
            }
        }
    }

    /// Set a cell's movement cost (difficult terrain).
    pub fn set_cost(&mut self, coord: GridCoord, cost: f32) -> Result<(), PlacementError> {
        self.ensure_in_bounds(coord)?;
        if !(cost > 0.0) {
            return Err(PlacementError::InvalidCost { coord, cost });
        }
        let idx = self.index(coord);
        self.cells[idx].cost = cost;
        Ok(())
    }

    // --- Agent and obstacle movement ---

    /// Move the agent from `from` to `to`, restoring the vacated cell.
    ///
    /// A traffic-controlled cell keeps its occupancy while the agent stands
    /// on it; the agent position field tracks where the agent actually is.
    pub fn move_agent(&mut self, from: GridCoord, to: GridCoord) {
        if self.in_bounds(from) {
            let idx = self.index(from);
            let cell = &mut self.cells[idx];
            cell.occupancy = if cell.light.is_some() {
                Occupancy::TrafficLight
            } else {
                Occupancy::Free
            };
        }
        if self.in_bounds(to) {
            let idx = self.index(to);
            if self.cells[idx].light.is_none() {
                self.cells[idx].occupancy = Occupancy::Start;
            }
        }
        self.agent_pos = Some(to);
        self.revision += 1;
    }

    /// May a dynamic obstacle move into this cell?
    ///
    /// Legal iff in bounds, free, not goal-marked and not the agent's cell.
    /// Barriers, other occupants, the start cell and traffic-controlled
    /// cells all fail the `Free` check.
    pub fn obstacle_destination_legal(&self, coord: GridCoord) -> bool {
        self.occupancy(coord) == Some(Occupancy::Free)
            && !self.is_goal(coord)
            && self.agent_pos != Some(coord)
    }

    // --- Traffic lights ---

    /// Recompute every traffic light's phase from the elapsed cycle time.
    pub fn advance_traffic_lights(&mut self, now: f64) {
        let cycle = self.cycle_length;
        let mut changed = false;
        for cell in &mut self.cells {
            if let Some(light) = cell.light.as_mut() {
                let phase = LightPhase::from_elapsed(now - light.phase_start, cycle);
                if phase != light.phase {
                    light.phase = phase;
                    changed = true;
                }
            }
        }
        if changed {
            self.revision += 1;
        }
    }

    // --- Neighbor queries ---

    /// Adjacent traversable cells, 8-directional.
    ///
    /// Excludes out-of-bounds cells, barriers, dynamic occupants and
    /// currently-red traffic cells. Results are cached until the next
    /// occupancy or light-phase mutation; repeated calls without an
    /// intervening mutation return identical ordered results.
    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridCoord> {
        let mut cache = self.neighbor_cache.borrow_mut();
        if cache.revision != self.revision {
            cache.map.clear();
            cache.revision = self.revision;
        }
        if let Some(cached) = cache.map.get(&coord) {
            return cached.clone();
        }
        let computed: Vec<GridCoord> = coord
            .neighbors_8()
            .iter()
            .copied()
            .filter(|n| self.is_traversable(*n))
            .collect();
        cache.map.insert(coord, computed.clone());
        computed
    }

    /// ASCII rendering for logs and debugging.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.rows + 1));
        for row in 0..self.rows as i32 {
            for col in 0..self.rows as i32 {
                let coord = GridCoord::new(row, col);
                let ch = if self.is_goal(coord) {
                    'G'
                } else {
                    self.occupancy(coord).unwrap().as_char()
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}
