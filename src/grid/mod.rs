//! Grid model: occupancy storage, editor mutations, neighbor queries and
//! traffic light phasing.
//!
//! The grid owns no planning logic. It answers state queries, applies
//! cell-targeted mutations, and computes the 8-directional traversable
//! neighborhood that the search engine consumes.

mod storage;

pub use storage::{Grid, PlacementError};
