//! Weighted A* search on the occupancy grid.
//!
//! - 8-connected movement with diagonal step cost √2
//! - Step cost multiplied by the destination cell's movement cost
//! - Euclidean heuristic (admissible for 8-connected movement)
//! - FIFO-stable tie-breaking via a monotonic insertion sequence, so
//!   equal-cost searches are deterministic
//! - Optional sensed-knowledge filter for partial-information planning

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::{debug, trace};

use crate::agent::Knowledge;
use crate::core::GridCoord;
use crate::grid::Grid;

/// A* configuration.
#[derive(Clone, Debug)]
pub struct AStarConfig {
    /// Diagonal step cost before terrain weighting.
    pub diagonal_cost: f32,
    /// Maximum number of node expansions before giving up.
    pub max_iterations: usize,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            diagonal_cost: std::f32::consts::SQRT_2,
            max_iterations: 100_000,
        }
    }
}

/// A node in the search frontier.
#[derive(Clone, Debug)]
struct SearchNode {
    coord: GridCoord,
    f_cost: f32,
    /// Insertion sequence for FIFO tie-breaking on equal f.
    seq: u64,
}

impl Eq for SearchNode {}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; on equal f, the earlier
        // insertion wins.
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Why a search produced no path.
///
/// "No path exists" is an expected outcome, not an error condition, so it
/// is carried as data rather than an `Err`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathFailure {
    /// Origin or goal lies outside the grid.
    OutOfBounds,
    /// The frontier emptied without reaching the goal.
    NotFound,
    /// Expansion budget exhausted before the goal was popped.
    MaxIterationsExceeded,
}

/// Result of one search invocation.
#[derive(Clone, Debug)]
pub struct PathResult {
    /// Ordered cells from origin to goal inclusive (empty on failure).
    pub path: Vec<GridCoord>,
    /// Total weighted cost of the path.
    pub cost: f32,
    /// Number of nodes expanded during the search.
    pub nodes_expanded: usize,
    /// Reason the search failed, if it did.
    pub failure: Option<PathFailure>,
}

impl PathResult {
    fn found(path: Vec<GridCoord>, cost: f32, nodes_expanded: usize) -> Self {
        Self {
            path,
            cost,
            nodes_expanded,
            failure: None,
        }
    }

    fn failed(failure: PathFailure, nodes_expanded: usize) -> Self {
        Self {
            path: Vec::new(),
            cost: f32::INFINITY,
            nodes_expanded,
            failure: Some(failure),
        }
    }

    /// Did the search produce a path?
    #[inline]
    pub fn is_found(&self) -> bool {
        self.failure.is_none()
    }
}

/// Weighted A* planner borrowing the grid for one or more searches.
pub struct AStarPlanner<'a> {
    grid: &'a Grid,
    config: AStarConfig,
}

impl<'a> AStarPlanner<'a> {
    /// Create a planner with the given configuration.
    pub fn new(grid: &'a Grid, config: AStarConfig) -> Self {
        Self { grid, config }
    }

    /// Create a planner with default configuration.
    pub fn with_defaults(grid: &'a Grid) -> Self {
        Self::new(grid, AStarConfig::default())
    }

    /// Find a path from `origin` to `goal`.
    ///
    /// With `knowledge` provided, any neighbor whose sensed occupancy
    /// forbids movement is excluded even if the full grid would allow it;
    /// unsensed cells are optimistically traversable. Without `knowledge`
    /// the search runs against full grid truth.
    pub fn find_path(
        &self,
        origin: GridCoord,
        goal: GridCoord,
        knowledge: Option<&Knowledge>,
    ) -> PathResult {
        trace!(
            "astar: ({},{}) -> ({},{})",
            origin.row, origin.col, goal.row, goal.col
        );

        if !self.grid.in_bounds(origin) || !self.grid.in_bounds(goal) {
            debug!("astar: origin or goal out of bounds");
            return PathResult::failed(PathFailure::OutOfBounds, 0);
        }

        // Predecessor links and g-scores are local to this invocation and
        // discarded after reconstruction; cells carry no search state.
        let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut g_score: HashMap<GridCoord, f32> = HashMap::new();
        let mut closed: HashSet<GridCoord> = HashSet::new();
        let mut frontier: BinaryHeap<SearchNode> = BinaryHeap::new();
        let mut seq: u64 = 0;
        let mut expanded = 0usize;

        g_score.insert(origin, 0.0);
        frontier.push(SearchNode {
            coord: origin,
            f_cost: origin.euclidean_distance(&goal),
            seq,
        });

        while let Some(node) = frontier.pop() {
            let current = node.coord;
            if closed.contains(&current) {
                // Already resolved with a lower or equal g; skip stale entry.
                continue;
            }
            closed.insert(current);
            expanded += 1;

            if current == goal {
                let path = reconstruct(&came_from, origin, goal);
                let cost = g_score[&goal];
                debug!(
                    "astar: path found, {} cells, cost {:.3}, {} expanded",
                    path.len(),
                    cost,
                    expanded
                );
                return PathResult::found(path, cost, expanded);
            }

            if expanded > self.config.max_iterations {
                debug!("astar: max iterations exceeded ({})", expanded);
                return PathResult::failed(PathFailure::MaxIterationsExceeded, expanded);
            }

            let current_g = g_score[&current];
            for neighbor in self.grid.neighbors(current) {
                if let Some(known) = knowledge {
                    if !known.allows(neighbor) {
                        continue;
                    }
                }

                let step = if current.is_diagonal_step(&neighbor) {
                    self.config.diagonal_cost
                } else {
                    1.0
                };
                let terrain = knowledge
                    .and_then(|k| k.sensed_cost(neighbor))
                    .unwrap_or_else(|| self.grid.cost(neighbor));
                let tentative_g = current_g + step * terrain;

                let best = g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g < best {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    seq += 1;
                    frontier.push(SearchNode {
                        coord: neighbor,
                        f_cost: tentative_g + neighbor.euclidean_distance(&goal),
                        seq,
                    });
                }
            }
        }

        debug!("astar: no path, {} nodes expanded", expanded);
        PathResult::failed(PathFailure::NotFound, expanded)
    }
}

/// Walk predecessor links from goal back to origin, then reverse.
fn reconstruct(
    came_from: &HashMap<GridCoord, GridCoord>,
    origin: GridCoord,
    goal: GridCoord,
) -> Vec<GridCoord> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != origin {
        current = came_from[&current];
        path.push(current);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Knowledge;
    use crate::core::Occupancy;

    fn open_grid(rows: usize) -> Grid {
        Grid::new(rows, 10.0)
    }

    fn plan(grid: &Grid, from: (i32, i32), to: (i32, i32)) -> PathResult {
        AStarPlanner::with_defaults(grid).find_path(
            GridCoord::new(from.0, from.1),
            GridCoord::new(to.0, to.1),
            None,
        )
    }

    #[test]
    fn test_empty_grid_diagonal() {
        // 5x5 empty grid: the optimal route is purely diagonal.
        let grid = open_grid(5);
        let result = plan(&grid, (0, 0), (4, 4));
        assert!(result.is_found());
        assert_eq!(result.path.len(), 5);
        for pair in result.path.windows(2) {
            assert!(pair[0].is_diagonal_step(&pair[1]));
        }
        assert!((result.cost - 4.0 * std::f32::consts::SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_wall_with_gap() {
        // Wall at column 2, only row 0 open.
        let mut grid = open_grid(5);
        for row in 1..5 {
            grid.place_barrier(GridCoord::new(row, 2)).unwrap();
        }
        let result = plan(&grid, (0, 0), (4, 4));
        assert!(result.is_found());
        assert!(result.path.contains(&GridCoord::new(0, 2)));
    }

    #[test]
    fn test_walled_off_goal_not_found() {
        // Fully enclosed goal yields NotFound.
        let mut grid = open_grid(7);
        let goal = GridCoord::new(3, 3);
        for n in goal.neighbors_8() {
            grid.place_barrier(n).unwrap();
        }
        let result = plan(&grid, (0, 0), (3, 3));
        assert!(!result.is_found());
        assert_eq!(result.failure, Some(PathFailure::NotFound));
    }

    #[test]
    fn test_out_of_bounds_goal() {
        let grid = open_grid(5);
        let result = plan(&grid, (0, 0), (9, 9));
        assert_eq!(result.failure, Some(PathFailure::OutOfBounds));
    }

    #[test]
    fn test_path_endpoints_and_adjacency() {
        let mut grid = open_grid(8);
        grid.place_barrier(GridCoord::new(4, 4)).unwrap();
        let result = plan(&grid, (1, 1), (6, 7));
        assert!(result.is_found());
        assert_eq!(result.path[0], GridCoord::new(1, 1));
        assert_eq!(*result.path.last().unwrap(), GridCoord::new(6, 7));
        for pair in result.path.windows(2) {
            assert_eq!(pair[0].chebyshev_distance(&pair[1]), 1);
        }
    }

    #[test]
    fn test_optimality_against_dijkstra_cost() {
        // Orthogonal detour vs diagonal shortcut: optimal cost through an
        // L-shaped barrier is known by construction.
        let mut grid = open_grid(5);
        grid.place_barrier(GridCoord::new(1, 1)).unwrap();
        grid.place_barrier(GridCoord::new(1, 2)).unwrap();
        grid.place_barrier(GridCoord::new(1, 3)).unwrap();
        let result = plan(&grid, (0, 2), (2, 2));
        assert!(result.is_found());
        // Around either end of the wall: 2 diagonal + 2 straight steps.
        let expected = 2.0 * std::f32::consts::SQRT_2 + 2.0;
        assert!((result.cost - expected).abs() < 1e-3);
    }

    #[test]
    fn test_terrain_cost_avoided() {
        // A mud field on the straight route makes the detour cheaper.
        let mut grid = open_grid(3);
        grid.set_cost(GridCoord::new(1, 1), 10.0).unwrap();
        let result = plan(&grid, (1, 0), (1, 2));
        assert!(result.is_found());
        assert!(!result.path.contains(&GridCoord::new(1, 1)));
    }

    #[test]
    fn test_deterministic_on_ties() {
        // Many equal-cost paths exist; FIFO tie-breaking must pick the same
        // one every run.
        let grid = open_grid(9);
        let first = plan(&grid, (0, 0), (8, 3));
        for _ in 0..5 {
            let again = plan(&grid, (0, 0), (8, 3));
            assert_eq!(first.path, again.path);
        }
    }

    #[test]
    fn test_trivial_path() {
        let grid = open_grid(5);
        let result = plan(&grid, (2, 2), (2, 2));
        assert!(result.is_found());
        assert_eq!(result.path, vec![GridCoord::new(2, 2)]);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_knowledge_blocks_sensed_cells() {
        // Ground truth allows the corridor, but the sensed map says the
        // middle cell is occupied; the search must route around it.
        let grid = open_grid(3);
        let mut knowledge = Knowledge::new();
        knowledge.record(GridCoord::new(1, 1), Occupancy::Dynamic, 1.0);
        let planner = AStarPlanner::with_defaults(&grid);
        let result = planner.find_path(
            GridCoord::new(1, 0),
            GridCoord::new(1, 2),
            Some(&knowledge),
        );
        assert!(result.is_found());
        assert!(!result.path.contains(&GridCoord::new(1, 1)));
    }

    #[test]
    fn test_unsensed_cells_optimistic() {
        // Knowledge covering nothing behaves like full-truth search.
        let grid = open_grid(5);
        let knowledge = Knowledge::new();
        let planner = AStarPlanner::with_defaults(&grid);
        let with = planner.find_path(GridCoord::new(0, 0), GridCoord::new(4, 4), Some(&knowledge));
        let without = planner.find_path(GridCoord::new(0, 0), GridCoord::new(4, 4), None);
        assert_eq!(with.path, without.path);
    }
}
