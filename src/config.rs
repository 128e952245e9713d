//! Simulation configuration.
//!
//! All fields have defaults, so a partial YAML file (or none at all) yields
//! a runnable configuration.

use std::fs::File;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;
use crate::error::Result;
use crate::obstacles::ObstacleConfig;

/// Top-level simulation parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Grid dimension (the grid is rows × rows).
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Traffic light cycle length in simulated seconds.
    #[serde(default = "default_traffic_cycle_secs")]
    pub traffic_cycle_secs: f64,

    /// Simulated seconds per tick.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,

    /// Agent parameters.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Dynamic obstacle parameters.
    #[serde(default)]
    pub obstacles: ObstacleConfig,
}

fn default_rows() -> usize {
    25
}
fn default_traffic_cycle_secs() -> f64 {
    5.0
}
fn default_tick_interval() -> f64 {
    0.1
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            traffic_cycle_secs: default_traffic_cycle_secs(),
            tick_interval: default_tick_interval(),
            agent: AgentConfig::default(),
            obstacles: ObstacleConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: SimConfig = serde_yaml::from_reader(file)?;
        info!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }
}
