//! Persistence: YAML snapshots of the world layout.

mod snapshot;

pub use snapshot::{
    CellRecord, CostRecord, GoalRecord, LightRecord, ObstacleRecord, Snapshot,
};
