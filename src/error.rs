//! Error types for marga-sim.

use thiserror::Error;

use crate::grid::PlacementError;

/// Top-level error type for the simulator.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid placement: {0}")]
    Placement(#[from] PlacementError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("grid dimension mismatch: snapshot has {found} rows, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl From<serde_yaml::Error> for SimError {
    fn from(e: serde_yaml::Error) -> Self {
        SimError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
