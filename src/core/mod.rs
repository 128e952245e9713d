//! Fundamental types shared by every subsystem.
//!
//! - [`GridCoord`]: integer cell coordinates with neighborhood helpers
//! - [`Occupancy`]: mutually exclusive cell occupancy kinds
//! - [`Cell`]: one grid position with cost and optional traffic light
//! - [`LightPhase`]: traffic light phase derived purely from elapsed time

mod cell;
mod coord;

pub use cell::{Cell, LightPhase, Occupancy, TrafficLight};
pub use coord::GridCoord;
