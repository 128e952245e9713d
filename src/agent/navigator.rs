//! Navigation agent state machine.
//!
//! The agent owns its position, a prioritized goal queue, a battery/sensor
//! resource model and the active path. Every tick it takes at most one
//! planning-or-step action: plan toward the selected goal, advance one cell
//! along the path, pause at a non-green light, or acknowledge a blockage
//! and replan.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::{GridCoord, LightPhase, Occupancy};
use crate::grid::Grid;
use crate::pathfinding::{AStarConfig, AStarPlanner};

use super::goals::{Goal, GoalQueue};
use super::perception::Knowledge;

/// Why the agent is paused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseReason {
    /// The next path cell is traffic-controlled and not green.
    TrafficLight,
}

/// Agent state machine states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentState {
    /// No goal selected yet.
    Idle,
    /// Searching for a path to the selected goal.
    Planning,
    /// Executing the active path one cell per move interval.
    Following,
    /// Waiting out a cooldown before re-evaluating the next cell.
    Paused { reason: PauseReason, until: f64 },
    /// Blockage detected on the path; replan pending.
    Blocked,
    /// Path cursor reached the goal cell.
    GoalReached,
    /// Battery depleted before goal completion. Terminal.
    Exhausted,
    /// All goals completed or skipped. Terminal.
    Done,
}

/// Agent resource and gating parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Battery capacity.
    #[serde(default = "default_max_battery")]
    pub max_battery: f32,

    /// Battery units consumed per step.
    #[serde(default = "default_drain_rate")]
    pub drain_rate: f32,

    /// Perception radius in cells (Euclidean).
    #[serde(default = "default_sensor_radius")]
    pub sensor_radius: f32,

    /// Movement speed multiplier; higher moves more often.
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f32,

    /// Base interval between steps in simulated seconds, divided by the
    /// speed multiplier.
    #[serde(default = "default_base_move_interval")]
    pub base_move_interval: f64,

    /// Fixed cooldown after pausing at a traffic light, in simulated
    /// seconds.
    #[serde(default = "default_pause_cooldown")]
    pub pause_cooldown: f64,
}

fn default_max_battery() -> f32 {
    100.0
}
fn default_drain_rate() -> f32 {
    1.0
}
fn default_sensor_radius() -> f32 {
    4.0
}
fn default_speed_multiplier() -> f32 {
    1.0
}
fn default_base_move_interval() -> f64 {
    0.4
}
fn default_pause_cooldown() -> f64 {
    2.0
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_battery: default_max_battery(),
            drain_rate: default_drain_rate(),
            sensor_radius: default_sensor_radius(),
            speed_multiplier: default_speed_multiplier(),
            base_move_interval: default_base_move_interval(),
            pause_cooldown: default_pause_cooldown(),
        }
    }
}

/// Cumulative run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentStats {
    /// Cells stepped onto.
    pub steps: u64,
    /// Distance traveled in cell units (diagonals count √2).
    pub distance: f32,
    /// Replans triggered by blockages and unreachable goals.
    pub replans: u32,
}

/// The navigation agent.
pub struct NavAgent {
    config: AgentConfig,
    planner_config: AStarConfig,
    position: GridCoord,
    state: AgentState,
    path: Vec<GridCoord>,
    /// Index of the agent's current cell within `path`.
    cursor: usize,
    battery: f32,
    goals: GoalQueue,
    current_goal: Option<Goal>,
    knowledge: Knowledge,
    last_move_time: f64,
    stats: AgentStats,
}

impl NavAgent {
    /// Create an agent at `start` with the given goal queue.
    pub fn new(start: GridCoord, goals: GoalQueue, config: AgentConfig) -> Self {
        Self {
            battery: config.max_battery,
            config,
            planner_config: AStarConfig::default(),
            position: start,
            state: AgentState::Idle,
            path: Vec::new(),
            cursor: 0,
            goals,
            current_goal: None,
            knowledge: Knowledge::new(),
            last_move_time: f64::NEG_INFINITY,
            stats: AgentStats::default(),
        }
    }

    /// Advance the agent by at most one planning-or-step action.
    pub fn update(&mut self, grid: &mut Grid, now: f64) {
        if matches!(self.state, AgentState::Done | AgentState::Exhausted) {
            return;
        }

        // Battery is checked before acting; a goal reached on the final
        // unit of charge still counts as reached.
        if self.battery <= 0.0 && self.state != AgentState::GoalReached {
            warn!("battery depleted at ({},{})", self.position.row, self.position.col);
            self.state = AgentState::Exhausted;
            return;
        }

        self.knowledge
            .refresh(grid, self.position, self.config.sensor_radius);

        match self.state {
            AgentState::Idle => {
                if self.goals.is_empty() {
                    self.state = AgentState::Done;
                } else {
                    self.state = AgentState::Planning;
                }
            }
            AgentState::Planning => self.plan(grid),
            AgentState::Following => self.follow(grid, now),
            AgentState::Paused { until, .. } => {
                if now >= until {
                    // Cooldown elapsed: re-attempt the same next cell; the
                    // light check inside may re-pause.
                    self.state = AgentState::Following;
                    self.follow(grid, now);
                }
            }
            AgentState::Blocked => {
                self.state = AgentState::Planning;
                self.plan(grid);
            }
            AgentState::GoalReached => self.finish_goal(grid),
            AgentState::Exhausted | AgentState::Done => {}
        }
    }

    /// Select a goal if needed and search for a path to it.
    fn plan(&mut self, grid: &mut Grid) {
        let goal = match self.current_goal {
            Some(goal) => goal,
            None => match self.goals.select() {
                Some(goal) => {
                    info!(
                        "selected goal ({},{}) priority {}",
                        goal.coord.row, goal.coord.col, goal.priority
                    );
                    self.current_goal = Some(goal);
                    goal
                }
                None => {
                    info!("all goals completed");
                    self.state = AgentState::Done;
                    return;
                }
            },
        };

        let planner = AStarPlanner::new(grid, self.planner_config.clone());
        let result = planner.find_path(self.position, goal.coord, Some(&self.knowledge));

        if result.is_found() {
            self.path = result.path;
            self.cursor = 0;
            self.state = AgentState::Following;
        } else {
            warn!(
                "goal ({},{}) unreachable, skipping ({:?})",
                goal.coord.row, goal.coord.col, result.failure
            );
            self.goals.complete(goal.coord, false);
            grid.remove_goal(goal.coord);
            self.current_goal = None;
            self.stats.replans += 1;
            if self.goals.is_empty() {
                self.state = AgentState::Done;
            }
            // Otherwise stay in Planning; the next tick selects the next goal.
        }
    }

    /// Attempt one step along the active path.
    fn follow(&mut self, grid: &mut Grid, now: f64) {
        let interval = self.config.base_move_interval / self.config.speed_multiplier as f64;
        if now - self.last_move_time < interval {
            // Move gating: tick consumed, no state change.
            return;
        }

        if self.cursor + 1 >= self.path.len() {
            self.state = AgentState::GoalReached;
            return;
        }
        let next = self.path[self.cursor + 1];

        if let Some(phase) = grid.light_phase(next) {
            if phase != LightPhase::Green {
                debug!(
                    "waiting at ({},{}) for {:?} light",
                    next.row, next.col, phase
                );
                self.state = AgentState::Paused {
                    reason: PauseReason::TrafficLight,
                    until: now + self.config.pause_cooldown,
                };
                return;
            }
        }

        let occupancy = grid.occupancy(next).unwrap_or(Occupancy::Barrier);
        if occupancy.blocks_movement() {
            debug!(
                "path blocked at ({},{}) by {:?}, replanning",
                next.row, next.col, occupancy
            );
            self.path.clear();
            self.cursor = 0;
            self.stats.replans += 1;
            self.state = AgentState::Blocked;
            return;
        }

        let step_len = if self.position.is_diagonal_step(&next) {
            std::f32::consts::SQRT_2
        } else {
            1.0
        };
        grid.move_agent(self.position, next);
        self.position = next;
        self.cursor += 1;
        self.battery = (self.battery - self.config.drain_rate).max(0.0);
        self.stats.steps += 1;
        self.stats.distance += step_len;
        self.last_move_time = now;

        if self.cursor + 1 >= self.path.len() {
            self.state = AgentState::GoalReached;
        }
    }

    /// Mark the current goal completed and move on.
    fn finish_goal(&mut self, grid: &mut Grid) {
        if let Some(goal) = self.current_goal.take() {
            info!(
                "goal ({},{}) reached, {} remaining",
                goal.coord.row,
                goal.coord.col,
                self.goals.remaining().saturating_sub(1)
            );
            self.goals.complete(goal.coord, true);
            grid.remove_goal(goal.coord);
        }
        self.path.clear();
        self.cursor = 0;
        self.state = if self.goals.is_empty() {
            AgentState::Done
        } else {
            AgentState::Planning
        };
    }

    // --- Read-only queries for renderer collaborators ---

    /// Current cell.
    #[inline]
    pub fn position(&self) -> GridCoord {
        self.position
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Remaining battery.
    #[inline]
    pub fn battery(&self) -> f32 {
        self.battery
    }

    /// Battery as a fraction of capacity.
    #[inline]
    pub fn battery_fraction(&self) -> f32 {
        if self.config.max_battery > 0.0 {
            self.battery / self.config.max_battery
        } else {
            0.0
        }
    }

    /// The active path (empty when not following).
    #[inline]
    pub fn path(&self) -> &[GridCoord] {
        &self.path
    }

    /// Index of the current cell within the active path.
    #[inline]
    pub fn path_cursor(&self) -> usize {
        self.cursor
    }

    /// The goal queue.
    #[inline]
    pub fn goals(&self) -> &GoalQueue {
        &self.goals
    }

    /// The goal currently being pursued.
    #[inline]
    pub fn current_goal(&self) -> Option<Goal> {
        self.current_goal
    }

    /// The sensor-limited knowledge map.
    #[inline]
    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    /// Cumulative statistics.
    #[inline]
    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    /// Agent configuration.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
