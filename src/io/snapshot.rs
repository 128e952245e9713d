//! World snapshots.
//!
//! A snapshot records the static layout (barriers, traffic lights, goals,
//! terrain costs, start cell), the dynamic obstacles and the agent
//! parameters as YAML. Loading is lenient per record: a record that fails
//! placement is logged and skipped, so one bad entry does not lose the
//! rest of the file. A dimension mismatch against an existing grid is
//! fatal.

use std::fs::File;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;
use crate::config::SimConfig;
use crate::core::{GridCoord, Occupancy};
use crate::error::{Result, SimError};
use crate::obstacles::MovementPolicy;
use crate::sim::Simulation;

/// A bare cell reference.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub row: i32,
    pub col: i32,
}

/// A traffic-controlled cell and its cycle offset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightRecord {
    pub row: i32,
    pub col: i32,
    /// Time at which this light's cycle began, in simulated seconds.
    #[serde(default)]
    pub phase_start: f64,
}

/// A goal marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub row: i32,
    pub col: i32,
    pub priority: i32,
}

/// A non-default terrain cost.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub row: i32,
    pub col: i32,
    pub cost: f32,
}

/// A dynamic obstacle and its movement policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRecord {
    pub row: i32,
    pub col: i32,
    #[serde(flatten)]
    pub policy: MovementPolicy,
}

/// A serializable world layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Grid dimension (rows == columns).
    pub dimension: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub barriers: Vec<CellRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_lights: Vec<LightRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<GoalRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<CostRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CellRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstacles: Vec<ObstacleRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,
}

impl Snapshot {
    /// Capture the current world layout.
    ///
    /// Obstacles are recorded at their current cells, so a mid-run capture
    /// resumes with the world as it stands.
    pub fn capture(sim: &Simulation) -> Self {
        let grid = sim.grid();
        let rows = grid.rows() as i32;
        let mut snapshot = Snapshot {
            dimension: grid.rows(),
            ..Snapshot::default()
        };

        for row in 0..rows {
            for col in 0..rows {
                let coord = GridCoord::new(row, col);
                match grid.occupancy(coord) {
                    Some(Occupancy::Barrier) => {
                        snapshot.barriers.push(CellRecord { row, col });
                    }
                    Some(Occupancy::TrafficLight) => {
                        snapshot.traffic_lights.push(LightRecord {
                            row,
                            col,
                            phase_start: grid.light_phase_start(coord).unwrap_or(0.0),
                        });
                    }
                    _ => {}
                }
                let cost = grid.cost(coord);
                if (cost - 1.0).abs() > f32::EPSILON {
                    snapshot.costs.push(CostRecord { row, col, cost });
                }
            }
        }

        for (coord, priority) in grid.goal_markers() {
            snapshot.goals.push(GoalRecord {
                row: coord.row,
                col: coord.col,
                priority: *priority,
            });
        }

        snapshot.start = grid.start().map(|c| CellRecord {
            row: c.row,
            col: c.col,
        });

        for obstacle in sim.obstacles().iter() {
            snapshot.obstacles.push(ObstacleRecord {
                row: obstacle.position().row,
                col: obstacle.position().col,
                policy: obstacle.policy().clone(),
            });
        }

        snapshot.agent = Some(sim.config().agent.clone());
        snapshot
    }

    /// Write the snapshot to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_yaml::to_writer(file, self)
            .map_err(|e| SimError::Snapshot(e.to_string()))?;
        info!("snapshot saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Read a snapshot from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: Snapshot =
            serde_yaml::from_reader(file).map_err(|e| SimError::Snapshot(e.to_string()))?;
        info!(
            "snapshot loaded from {} ({} barriers, {} lights, {} goals, {} obstacles)",
            path.as_ref().display(),
            snapshot.barriers.len(),
            snapshot.traffic_lights.len(),
            snapshot.goals.len(),
            snapshot.obstacles.len()
        );
        Ok(snapshot)
    }

    /// Apply this snapshot onto a fresh simulation.
    ///
    /// The simulation's grid dimension must match the snapshot's; anything
    /// else is [`SimError::DimensionMismatch`]. Individual records that
    /// fail placement are logged and skipped.
    pub fn apply_to(&self, sim: &mut Simulation) -> Result<()> {
        if sim.grid().rows() != self.dimension {
            return Err(SimError::DimensionMismatch {
                expected: sim.grid().rows(),
                found: self.dimension,
            });
        }

        if let Some(agent) = &self.agent {
            sim.set_agent_config(agent.clone());
        }

        for record in &self.barriers {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.grid_mut().place_barrier(coord) {
                warn!("skipping barrier record: {}", e);
            }
        }
        for record in &self.traffic_lights {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.grid_mut().place_traffic_light(coord, record.phase_start) {
                warn!("skipping traffic light record: {}", e);
            }
        }
        for record in &self.costs {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.grid_mut().set_cost(coord, record.cost) {
                warn!("skipping cost record: {}", e);
            }
        }
        for record in &self.goals {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.grid_mut().place_goal(coord, record.priority) {
                warn!("skipping goal record: {}", e);
            }
        }
        if let Some(record) = &self.start {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.grid_mut().set_start(coord) {
                warn!("skipping start record: {}", e);
            }
        }
        for record in &self.obstacles {
            let coord = GridCoord::new(record.row, record.col);
            if let Err(e) = sim.spawn_obstacle(coord, record.policy.clone()) {
                warn!("skipping obstacle record: {}", e);
            }
        }
        Ok(())
    }

    /// Build a simulation sized to this snapshot and apply it.
    pub fn into_simulation(&self, mut config: SimConfig) -> Result<Simulation> {
        config.rows = self.dimension;
        let mut sim = Simulation::new(config);
        self.apply_to(&mut sim)?;
        Ok(sim)
    }
}
