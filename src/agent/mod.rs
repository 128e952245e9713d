//! Navigation agent: goal queue, sensor-limited perception and the
//! planning/execution state machine.

mod goals;
mod navigator;
mod perception;

pub use goals::{CompletedGoal, Goal, GoalQueue};
pub use navigator::{AgentConfig, AgentState, AgentStats, NavAgent, PauseReason};
pub use perception::{Knowledge, SensedCell};
