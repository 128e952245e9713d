//! Simulation loop.
//!
//! The simulation owns the grid, the agent and the obstacle set, and drives
//! them with a fixed-phase tick on a simulated clock:
//!
//! 1. traffic lights recompute their phase from the clock,
//! 2. every due obstacle moves,
//! 3. the agent takes at most one planning-or-step action.
//!
//! All state lives on one thread; collaborators see a consistent world
//! between ticks.

use log::{debug, info};

use crate::agent::{AgentState, AgentStats, GoalQueue, NavAgent};
use crate::config::SimConfig;
use crate::core::GridCoord;
use crate::error::{Result, SimError};
use crate::grid::Grid;
use crate::obstacles::{MovementPolicy, ObstacleSet};

/// Grid layout and obstacle placements captured when the agent starts, so
/// the run can be replayed from scratch.
struct Baseline {
    grid: Grid,
    obstacles: Vec<(GridCoord, MovementPolicy)>,
}

/// The top-level simulation.
pub struct Simulation {
    config: SimConfig,
    grid: Grid,
    agent: Option<NavAgent>,
    obstacles: ObstacleSet,
    clock: f64,
    tick_count: u64,
    baseline: Option<Baseline>,
}

impl Simulation {
    /// Create a simulation with an empty grid.
    pub fn new(config: SimConfig) -> Self {
        let grid = Grid::new(config.rows, config.traffic_cycle_secs);
        let obstacles = ObstacleSet::new(config.obstacles.clone());
        Self {
            config,
            grid,
            agent: None,
            obstacles,
            clock: 0.0,
            tick_count: 0,
            baseline: None,
        }
    }

    /// The grid, for editing and rendering.
    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable grid access for layout editing.
    #[inline]
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// The agent, once started.
    #[inline]
    pub fn agent(&self) -> Option<&NavAgent> {
        self.agent.as_ref()
    }

    /// The obstacle set.
    #[inline]
    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    /// Simulated seconds since the run began.
    #[inline]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Ticks executed since the run began.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the agent parameters used by future [`start_agent`] calls.
    ///
    /// [`start_agent`]: Simulation::start_agent
    pub fn set_agent_config(&mut self, agent: crate::agent::AgentConfig) {
        self.config.agent = agent;
    }

    /// Spawn a dynamic obstacle at `coord`.
    pub fn spawn_obstacle(&mut self, coord: GridCoord, policy: MovementPolicy) -> Result<u32> {
        let id = self
            .obstacles
            .spawn(&mut self.grid, coord, policy, self.clock)?;
        Ok(id)
    }

    /// Start the agent from the grid's start cell, targeting the grid's
    /// goal markers. Captures the current layout as the reset baseline.
    pub fn start_agent(&mut self) -> Result<()> {
        let start = self
            .grid
            .start()
            .ok_or_else(|| SimError::NotFound("no start cell placed".into()))?;
        let goals = GoalQueue::from_markers(self.grid.goal_markers());
        info!(
            "agent starting at ({},{}) with {} goal(s)",
            start.row,
            start.col,
            goals.remaining()
        );

        // Baseline excludes dynamic occupants; they are respawned from
        // their descriptors on reset.
        let mut baseline_grid = self.grid.clone();
        for pos in self.obstacles.positions() {
            baseline_grid.set_occupancy(pos, crate::core::Occupancy::Free);
        }
        self.baseline = Some(Baseline {
            grid: baseline_grid,
            obstacles: self.obstacles.descriptors(),
        });

        self.agent = Some(NavAgent::new(start, goals, self.config.agent.clone()));
        Ok(())
    }

    /// Advance the simulation by one tick of `dt` simulated seconds.
    pub fn tick(&mut self, dt: f64) {
        self.clock += dt;
        self.tick_count += 1;

        self.grid.advance_traffic_lights(self.clock);
        self.obstacles.update(&mut self.grid, self.clock);
        if let Some(agent) = self.agent.as_mut() {
            agent.update(&mut self.grid, self.clock);
        }
    }

    /// Run ticks at the configured interval until the agent finishes or
    /// `max_ticks` elapse. Returns the number of ticks executed.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let dt = self.config.tick_interval;
        let mut executed = 0;
        while executed < max_ticks && !self.is_finished() {
            self.tick(dt);
            executed += 1;
        }
        debug!("run stopped after {} tick(s)", executed);
        executed
    }

    /// Has the agent reached a terminal state?
    ///
    /// A simulation without an agent never finishes on its own.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.agent.as_ref().map(|a| a.state()),
            Some(AgentState::Done) | Some(AgentState::Exhausted)
        )
    }

    /// Agent statistics, if an agent was started.
    pub fn stats(&self) -> Option<AgentStats> {
        self.agent.as_ref().map(|a| a.stats())
    }

    /// Restore the baseline layout, rewind the clock to zero and put a
    /// fresh agent at the start cell. Obstacles respawn at their original
    /// cells with a reseeded RNG, so a seeded run replays identically.
    pub fn reset(&mut self) -> Result<()> {
        let baseline = self
            .baseline
            .as_ref()
            .ok_or_else(|| SimError::NotFound("no baseline captured; agent never started".into()))?;

        self.grid = baseline.grid.clone();
        let descriptors = baseline.obstacles.clone();
        self.clock = 0.0;
        self.tick_count = 0;

        self.obstacles = ObstacleSet::new(self.config.obstacles.clone());
        for (coord, policy) in descriptors {
            self.obstacles.spawn(&mut self.grid, coord, policy, 0.0)?;
        }

        let start = self
            .grid
            .start()
            .ok_or_else(|| SimError::NotFound("baseline has no start cell".into()))?;
        let goals = GoalQueue::from_markers(self.grid.goal_markers());
        self.agent = Some(NavAgent::new(start, goals, self.config.agent.clone()));
        info!("simulation reset");
        Ok(())
    }
}
