//! Dynamic obstacles.
//!
//! Obstacles occupy exactly one cell each and move on their own schedule:
//! every obstacle carries a next-move deadline drawn uniformly from a
//! configurable interval, divided by a global speed factor. Movement is
//! destination-checked against the grid: barriers, other occupants,
//! traffic-controlled cells, goal markers and the agent's cell are all
//! refused, in which case the obstacle stays put and reschedules.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::GridCoord;
use crate::grid::{Grid, PlacementError};

/// Obstacle scheduling parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Lower bound of the move interval in simulated seconds.
    #[serde(default = "default_min_interval")]
    pub min_move_interval: f64,

    /// Upper bound of the move interval in simulated seconds.
    #[serde(default = "default_max_interval")]
    pub max_move_interval: f64,

    /// Global speed factor; intervals are divided by it.
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f64,

    /// RNG seed. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_interval() -> f64 {
    1.0
}
fn default_max_interval() -> f64 {
    3.0
}
fn default_speed_factor() -> f64 {
    1.0
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            min_move_interval: default_min_interval(),
            max_move_interval: default_max_interval(),
            speed_factor: default_speed_factor(),
            seed: None,
        }
    }
}

/// How an obstacle chooses its next cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementPolicy {
    /// Drift along a cardinal heading, occasionally re-picking it.
    RandomWalk,
    /// Step toward each waypoint in turn, cycling forever.
    Patrol { waypoints: Vec<GridCoord> },
}

/// Cardinal headings for the random walk.
const HEADINGS: [GridCoord; 4] = [
    GridCoord { row: -1, col: 0 },
    GridCoord { row: 0, col: 1 },
    GridCoord { row: 1, col: 0 },
    GridCoord { row: 0, col: -1 },
];

/// Probability of re-picking the heading on any given move.
const HEADING_CHANGE_PROB: f64 = 0.3;

/// Attempts per move before the obstacle gives up until its next deadline.
const MOVE_RETRIES: usize = 8;

/// One dynamic obstacle.
#[derive(Clone, Debug)]
pub struct DynamicObstacle {
    id: u32,
    position: GridCoord,
    /// Cell the obstacle was spawned on, for simulation resets.
    spawn_position: GridCoord,
    policy: MovementPolicy,
    heading: GridCoord,
    /// Index of the waypoint currently steered toward (patrol only).
    waypoint_index: usize,
    next_move_at: f64,
}

impl DynamicObstacle {
    /// Stable identifier.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current cell.
    #[inline]
    pub fn position(&self) -> GridCoord {
        self.position
    }

    /// Cell the obstacle was spawned on.
    #[inline]
    pub fn spawn_position(&self) -> GridCoord {
        self.spawn_position
    }

    /// Movement policy.
    #[inline]
    pub fn policy(&self) -> &MovementPolicy {
        &self.policy
    }
}

/// All dynamic obstacles plus their shared RNG.
pub struct ObstacleSet {
    obstacles: Vec<DynamicObstacle>,
    config: ObstacleConfig,
    rng: StdRng,
    next_id: u32,
}

impl ObstacleSet {
    /// Create an empty set. A fixed seed gives reproducible movement.
    pub fn new(config: ObstacleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            obstacles: Vec::new(),
            config,
            rng,
            next_id: 0,
        }
    }

    /// Spawn an obstacle at `coord`.
    ///
    /// The cell must be a legal obstacle destination; on success it becomes
    /// dynamically occupied and the obstacle's first move is scheduled.
    pub fn spawn(
        &mut self,
        grid: &mut Grid,
        coord: GridCoord,
        policy: MovementPolicy,
        now: f64,
    ) -> Result<u32, PlacementError> {
        if !grid.in_bounds(coord) {
            return Err(PlacementError::OutOfBounds { coord });
        }
        if grid.is_goal(coord) {
            return Err(PlacementError::GoalMarker { coord });
        }
        if !grid.obstacle_destination_legal(coord) {
            return Err(PlacementError::Protected {
                coord,
                occupied: grid.occupancy(coord).unwrap(),
            });
        }
        grid.set_occupancy(coord, crate::core::Occupancy::Dynamic);
        let id = self.next_id;
        self.next_id += 1;
        let heading = HEADINGS[self.rng.gen_range(0..HEADINGS.len())];
        let deadline = now + self.sample_interval();
        self.obstacles.push(DynamicObstacle {
            id,
            position: coord,
            spawn_position: coord,
            policy,
            heading,
            waypoint_index: 0,
            next_move_at: deadline,
        });
        debug!("obstacle {} spawned at ({},{})", id, coord.row, coord.col);
        Ok(id)
    }

    /// Remove an obstacle by id, freeing its cell.
    pub fn remove(&mut self, grid: &mut Grid, id: u32) -> bool {
        if let Some(pos) = self.obstacles.iter().position(|o| o.id == id) {
            let obstacle = self.obstacles.remove(pos);
            grid.set_occupancy(obstacle.position, crate::core::Occupancy::Free);
            true
        } else {
            false
        }
    }

    /// Move every obstacle whose deadline has passed, then reschedule it.
    ///
    /// An obstacle that finds no legal destination stays put until its next
    /// deadline.
    pub fn update(&mut self, grid: &mut Grid, now: f64) {
        for i in 0..self.obstacles.len() {
            if now < self.obstacles[i].next_move_at {
                continue;
            }
            let destination = self.pick_destination(grid, i);
            if let Some(to) = destination {
                let from = self.obstacles[i].position;
                grid.set_occupancy(from, crate::core::Occupancy::Free);
                grid.set_occupancy(to, crate::core::Occupancy::Dynamic);
                self.obstacles[i].position = to;
            }
            let deadline = now + self.sample_interval();
            self.obstacles[i].next_move_at = deadline;
        }
    }

    fn sample_interval(&mut self) -> f64 {
        let raw = self
            .rng
            .gen_range(self.config.min_move_interval..=self.config.max_move_interval);
        raw / self.config.speed_factor.max(f64::EPSILON)
    }

    fn pick_destination(&mut self, grid: &Grid, index: usize) -> Option<GridCoord> {
        match self.obstacles[index].policy.clone() {
            MovementPolicy::RandomWalk => self.pick_random_walk(grid, index),
            MovementPolicy::Patrol { waypoints } => self.pick_patrol(grid, index, &waypoints),
        }
    }

    /// Keep the heading most of the time; re-pick it with a fixed
    /// probability and whenever the cell ahead is refused.
    fn pick_random_walk(&mut self, grid: &Grid, index: usize) -> Option<GridCoord> {
        if self.rng.gen_bool(HEADING_CHANGE_PROB) {
            self.obstacles[index].heading = HEADINGS[self.rng.gen_range(0..HEADINGS.len())];
        }
        for _ in 0..MOVE_RETRIES {
            let candidate = self.obstacles[index].position + self.obstacles[index].heading;
            if grid.obstacle_destination_legal(candidate) {
                return Some(candidate);
            }
            self.obstacles[index].heading = HEADINGS[self.rng.gen_range(0..HEADINGS.len())];
        }
        None
    }

    /// One 8-directional step toward the current waypoint; cycle to the
    /// next waypoint on arrival.
    fn pick_patrol(
        &mut self,
        grid: &Grid,
        index: usize,
        waypoints: &[GridCoord],
    ) -> Option<GridCoord> {
        if waypoints.is_empty() {
            return None;
        }
        let position = self.obstacles[index].position;
        let mut target = waypoints[self.obstacles[index].waypoint_index % waypoints.len()];
        if target == position {
            self.obstacles[index].waypoint_index =
                (self.obstacles[index].waypoint_index + 1) % waypoints.len();
            target = waypoints[self.obstacles[index].waypoint_index];
            if target == position {
                return None;
            }
        }
        let step = GridCoord::new(
            (target.row - position.row).signum(),
            (target.col - position.col).signum(),
        );
        let candidate = position + step;
        if grid.obstacle_destination_legal(candidate) {
            Some(candidate)
        } else {
            warn!(
                "obstacle {} patrol step to ({},{}) refused",
                self.obstacles[index].id, candidate.row, candidate.col
            );
            None
        }
    }

    /// All obstacles.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &DynamicObstacle> {
        self.obstacles.iter()
    }

    /// Obstacle count.
    #[inline]
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Current obstacle positions.
    pub fn positions(&self) -> Vec<GridCoord> {
        self.obstacles.iter().map(|o| o.position).collect()
    }

    /// `(spawn position, policy)` pairs, for rebuilding the set on reset.
    pub fn descriptors(&self) -> Vec<(GridCoord, MovementPolicy)> {
        self.obstacles
            .iter()
            .map(|o| (o.spawn_position, o.policy.clone()))
            .collect()
    }

    /// Remove every obstacle, freeing their cells.
    pub fn clear(&mut self, grid: &mut Grid) {
        for obstacle in self.obstacles.drain(..) {
            grid.set_occupancy(obstacle.position, crate::core::Occupancy::Free);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Occupancy;

    fn seeded(seed: u64) -> ObstacleSet {
        ObstacleSet::new(ObstacleConfig {
            seed: Some(seed),
            ..ObstacleConfig::default()
        })
    }

    #[test]
    fn test_spawn_marks_cell_dynamic() {
        let mut grid = Grid::new(5, 10.0);
        let mut set = seeded(7);
        let id = set
            .spawn(&mut grid, GridCoord::new(2, 2), MovementPolicy::RandomWalk, 0.0)
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(grid.occupancy(GridCoord::new(2, 2)), Some(Occupancy::Dynamic));
    }

    #[test]
    fn test_spawn_refused_on_protected_cells() {
        let mut grid = Grid::new(5, 10.0);
        grid.place_barrier(GridCoord::new(1, 1)).unwrap();
        grid.place_goal(GridCoord::new(2, 2), 1).unwrap();
        grid.set_start(GridCoord::new(3, 3)).unwrap();
        let mut set = seeded(7);
        assert!(matches!(
            set.spawn(&mut grid, GridCoord::new(1, 1), MovementPolicy::RandomWalk, 0.0),
            Err(PlacementError::Protected { .. })
        ));
        assert!(matches!(
            set.spawn(&mut grid, GridCoord::new(2, 2), MovementPolicy::RandomWalk, 0.0),
            Err(PlacementError::GoalMarker { .. })
        ));
        assert!(matches!(
            set.spawn(&mut grid, GridCoord::new(3, 3), MovementPolicy::RandomWalk, 0.0),
            Err(PlacementError::Protected { .. })
        ));
        assert!(matches!(
            set.spawn(&mut grid, GridCoord::new(9, 9), MovementPolicy::RandomWalk, 0.0),
            Err(PlacementError::OutOfBounds { .. })
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_moves_stay_legal() {
        let mut grid = Grid::new(9, 10.0);
        grid.set_start(GridCoord::new(4, 4)).unwrap();
        grid.place_goal(GridCoord::new(0, 8), 1).unwrap();
        for col in 0..9 {
            grid.place_barrier(GridCoord::new(6, col)).unwrap();
        }
        let mut set = seeded(42);
        set.spawn(&mut grid, GridCoord::new(2, 2), MovementPolicy::RandomWalk, 0.0)
            .unwrap();
        set.spawn(&mut grid, GridCoord::new(7, 3), MovementPolicy::RandomWalk, 0.0)
            .unwrap();
        let mut now = 0.0;
        for _ in 0..200 {
            now += 0.5;
            set.update(&mut grid, now);
            for pos in set.positions() {
                assert_eq!(grid.occupancy(pos), Some(Occupancy::Dynamic));
                assert!(!grid.is_goal(pos));
                assert_ne!(pos, GridCoord::new(4, 4));
            }
        }
        // Exactly one dynamic cell per obstacle.
        let dynamic_count = (0..9)
            .flat_map(|r| (0..9).map(move |c| GridCoord::new(r, c)))
            .filter(|c| grid.occupancy(*c) == Some(Occupancy::Dynamic))
            .count();
        assert_eq!(dynamic_count, set.len());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed: u64| {
            let mut grid = Grid::new(9, 10.0);
            let mut set = seeded(seed);
            set.spawn(&mut grid, GridCoord::new(4, 4), MovementPolicy::RandomWalk, 0.0)
                .unwrap();
            let mut now = 0.0;
            for _ in 0..50 {
                now += 0.5;
                set.update(&mut grid, now);
            }
            set.positions()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_patrol_advances_toward_waypoints() {
        let mut grid = Grid::new(9, 10.0);
        let mut set = seeded(1);
        let waypoints = vec![GridCoord::new(0, 4), GridCoord::new(0, 0)];
        set.spawn(
            &mut grid,
            GridCoord::new(0, 0),
            MovementPolicy::Patrol { waypoints },
            0.0,
        )
        .unwrap();
        let mut now = 0.0;
        let mut reached_far_end = false;
        for _ in 0..100 {
            now += 0.5;
            set.update(&mut grid, now);
            if set.positions()[0] == GridCoord::new(0, 4) {
                reached_far_end = true;
            }
        }
        assert!(reached_far_end);
        // Patrol never leaves row 0.
        assert_eq!(set.positions()[0].row, 0);
    }

    #[test]
    fn test_boxed_in_obstacle_stays_put() {
        let mut grid = Grid::new(5, 10.0);
        for n in GridCoord::new(2, 2).neighbors_8() {
            grid.place_barrier(n).unwrap();
        }
        let mut set = seeded(3);
        set.spawn(&mut grid, GridCoord::new(2, 2), MovementPolicy::RandomWalk, 0.0)
            .unwrap();
        for step in 1..50 {
            set.update(&mut grid, step as f64);
        }
        assert_eq!(set.positions()[0], GridCoord::new(2, 2));
    }

    #[test]
    fn test_remove_frees_cell() {
        let mut grid = Grid::new(5, 10.0);
        let mut set = seeded(5);
        let id = set
            .spawn(&mut grid, GridCoord::new(1, 1), MovementPolicy::RandomWalk, 0.0)
            .unwrap();
        assert!(set.remove(&mut grid, id));
        assert!(!set.remove(&mut grid, id));
        assert_eq!(grid.occupancy(GridCoord::new(1, 1)), Some(Occupancy::Free));
    }
}
