//! Cell types for the navigation grid.
//!
//! Occupancy is a single tagged enum: exactly one kind holds for a cell at
//! any tick, which rules out the desynchronized-flag bugs that come from
//! tracking barrier/start/occupant state in separate booleans.

use serde::{Deserialize, Serialize};

/// Fraction of the traffic cycle spent green.
pub const GREEN_FRACTION: f64 = 0.7;
/// Fraction of the traffic cycle at which yellow ends and red begins.
pub const YELLOW_END_FRACTION: f64 = 0.8;

/// What occupies a cell right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    /// Nothing here; traversable.
    #[default]
    Free,

    /// Permanently impassable until explicitly cleared.
    Barrier,

    /// Temporarily impassable: a moving obstacle sits here.
    Dynamic,

    /// The navigation agent's current cell.
    Start,

    /// Traffic-controlled cell; passability depends on the light phase.
    TrafficLight,
}

impl Occupancy {
    /// Can a path ever run through this kind of cell?
    ///
    /// Traffic-controlled cells are conditionally traversable; the phase
    /// check lives in [`Cell::is_traversable`].
    #[inline]
    pub fn blocks_movement(self) -> bool {
        matches!(self, Occupancy::Barrier | Occupancy::Dynamic)
    }

    /// Single character representation for debugging.
    pub fn as_char(self) -> char {
        match self {
            Occupancy::Free => '.',
            Occupancy::Barrier => '#',
            Occupancy::Dynamic => 'o',
            Occupancy::Start => 'S',
            Occupancy::TrafficLight => 'T',
        }
    }
}

/// Phase of a traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightPhase {
    /// Traversable.
    Green,
    /// Still traversable, about to turn red.
    Yellow,
    /// Not traversable; excluded from neighbor sets.
    Red,
}

impl LightPhase {
    /// Compute the phase from elapsed time since the cycle started.
    ///
    /// Pure function of elapsed time, so traffic state is deterministic and
    /// replayable given a fixed start time. Periodic:
    /// `from_elapsed(t, c) == from_elapsed(t + c, c)`.
    pub fn from_elapsed(elapsed: f64, cycle_length: f64) -> Self {
        let fraction = (elapsed.rem_euclid(cycle_length)) / cycle_length;
        if fraction < GREEN_FRACTION {
            LightPhase::Green
        } else if fraction < YELLOW_END_FRACTION {
            LightPhase::Yellow
        } else {
            LightPhase::Red
        }
    }

    /// May the agent enter the cell during this phase?
    #[inline]
    pub fn is_traversable(self) -> bool {
        matches!(self, LightPhase::Green | LightPhase::Yellow)
    }
}

/// Traffic light state attached to a traffic-controlled cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrafficLight {
    /// Simulation time at which the cycle started.
    pub phase_start: f64,
    /// Current phase, recomputed by `Grid::advance_traffic_lights`.
    pub phase: LightPhase,
}

impl TrafficLight {
    /// Create a light whose cycle starts at `phase_start`.
    pub fn new(phase_start: f64) -> Self {
        Self {
            phase_start,
            phase: LightPhase::Green,
        }
    }
}

/// A single cell in the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    /// Current occupancy kind.
    pub occupancy: Occupancy,
    /// Movement cost multiplier; non-default values model difficult terrain.
    pub cost: f32,
    /// Present iff `occupancy == Occupancy::TrafficLight`.
    pub light: Option<TrafficLight>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            occupancy: Occupancy::Free,
            cost: 1.0,
            light: None,
        }
    }
}

impl Cell {
    /// Is the cell traversable at this instant?
    #[inline]
    pub fn is_traversable(&self) -> bool {
        match self.occupancy {
            Occupancy::Free | Occupancy::Start => true,
            Occupancy::TrafficLight => self
                .light
                .map(|l| l.phase.is_traversable())
                .unwrap_or(false),
            Occupancy::Barrier | Occupancy::Dynamic => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_fractions() {
        let cycle = 10.0;
        assert_eq!(LightPhase::from_elapsed(0.0, cycle), LightPhase::Green);
        assert_eq!(LightPhase::from_elapsed(6.9, cycle), LightPhase::Green);
        assert_eq!(LightPhase::from_elapsed(7.0, cycle), LightPhase::Yellow);
        assert_eq!(LightPhase::from_elapsed(7.9, cycle), LightPhase::Yellow);
        assert_eq!(LightPhase::from_elapsed(8.0, cycle), LightPhase::Red);
        assert_eq!(LightPhase::from_elapsed(9.99, cycle), LightPhase::Red);
    }

    #[test]
    fn test_phase_periodic() {
        let cycle = 4.0;
        for i in 0..40 {
            let t = i as f64 * 0.37;
            assert_eq!(
                LightPhase::from_elapsed(t, cycle),
                LightPhase::from_elapsed(t + cycle, cycle)
            );
        }
    }

    #[test]
    fn test_phase_negative_elapsed() {
        // rem_euclid keeps the phase well-defined for lights whose
        // phase_start lies in the future of the loaded clock.
        let cycle = 10.0;
        assert_eq!(LightPhase::from_elapsed(-1.0, cycle), LightPhase::Red);
        assert_eq!(LightPhase::from_elapsed(-9.0, cycle), LightPhase::Green);
    }

    #[test]
    fn test_default_cell_traversable() {
        let cell = Cell::default();
        assert!(cell.is_traversable());
        assert_eq!(cell.cost, 1.0);
    }

    #[test]
    fn test_red_light_blocks() {
        let mut cell = Cell {
            occupancy: Occupancy::TrafficLight,
            cost: 1.0,
            light: Some(TrafficLight::new(0.0)),
        };
        assert!(cell.is_traversable());
        cell.light.as_mut().unwrap().phase = LightPhase::Red;
        assert!(!cell.is_traversable());
    }
}
