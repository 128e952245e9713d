//! Path planning over the navigation grid.

mod astar;

pub use astar::{AStarConfig, AStarPlanner, PathFailure, PathResult};
