//! # Marga-Sim: Grid Navigation Simulator
//!
//! A deterministic 2-D occupancy-grid navigation simulator: a battery-limited
//! agent plans with weighted A* over a grid of barriers, difficult terrain,
//! traffic-controlled cells and randomly moving obstacles.
//!
//! ## Features
//!
//! - **Editable Grid**: Barriers, terrain costs, traffic lights, prioritized
//!   goals and a start cell, with placement conflicts rejected up front
//! - **Weighted A***: 8-directional search over per-cell costs with
//!   deterministic tie-breaking and an explicit failure taxonomy
//! - **Navigation Agent**: A plan/follow/pause/replan state machine driven
//!   by sensor-limited knowledge of the world
//! - **Dynamic World**: Seeded random-walk and patrol obstacles plus
//!   phase-cycling traffic lights
//! - **Snapshots**: The whole layout round-trips through YAML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marga_sim::config::SimConfig;
//! use marga_sim::core::GridCoord;
//! use marga_sim::sim::Simulation;
//!
//! let mut sim = Simulation::new(SimConfig::default());
//! sim.grid_mut().set_start(GridCoord::new(0, 0)).unwrap();
//! sim.grid_mut().place_goal(GridCoord::new(10, 10), 1).unwrap();
//! sim.start_agent().unwrap();
//! sim.run(10_000);
//! println!("{:?}", sim.stats().unwrap());
//! ```
//!
//! ## Tick Model
//!
//! The simulation is single-threaded. Each tick advances a simulated clock
//! and runs three phases in a fixed order: traffic lights, obstacles, then
//! the agent. The agent takes at most one planning-or-step action per tick.
//!
//! ## Architecture
//!
//! - [`core`]: Fundamental types (GridCoord, Cell, Occupancy, LightPhase)
//! - [`grid`]: Grid storage, placement rules and neighbor queries
//! - [`pathfinding`]: Weighted A* search
//! - [`agent`]: Goal queue, perception and the agent state machine
//! - [`obstacles`]: Dynamic obstacle scheduling and movement policies
//! - [`sim`]: The three-phase simulation loop
//! - [`io`]: YAML snapshots
//! - [`config`]: Simulation configuration

pub mod agent;
pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod io;
pub mod obstacles;
pub mod pathfinding;
pub mod sim;

pub use agent::{AgentConfig, AgentState, AgentStats, NavAgent};
pub use config::SimConfig;
pub use core::{Cell, GridCoord, LightPhase, Occupancy};
pub use error::{Result, SimError};
pub use grid::{Grid, PlacementError};
pub use io::Snapshot;
pub use obstacles::{MovementPolicy, ObstacleConfig, ObstacleSet};
pub use pathfinding::{AStarConfig, AStarPlanner, PathFailure, PathResult};
pub use sim::Simulation;
