//! Grid coordinate type.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Grid coordinates (integer cell indices).
///
/// `(0, 0)` is the top-left cell; `row` grows downward, `col` grows to the
/// right. Coordinates are signed so that neighbor offsets can step outside
/// the grid and be rejected by bounds checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// Row index
    pub row: i32,
    /// Column index
    pub col: i32,
}

impl GridCoord {
    /// Create a new grid coordinate.
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Euclidean distance to another coordinate, in cell units.
    #[inline]
    pub fn euclidean_distance(&self, other: &GridCoord) -> f32 {
        let dr = (self.row - other.row) as f32;
        let dc = (self.col - other.col) as f32;
        (dr * dr + dc * dc).sqrt()
    }

    /// Chebyshev distance (max of row and column distance).
    #[inline]
    pub fn chebyshev_distance(&self, other: &GridCoord) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }

    /// Is the step from `self` to `other` diagonal (both row and column change)?
    #[inline]
    pub fn is_diagonal_step(&self, other: &GridCoord) -> bool {
        self.row != other.row && self.col != other.col
    }

    /// The 4 cardinal neighbors (N, E, S, W).
    #[inline]
    pub fn neighbors_4(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.row - 1, self.col), // N
            GridCoord::new(self.row, self.col + 1), // E
            GridCoord::new(self.row + 1, self.col), // S
            GridCoord::new(self.row, self.col - 1), // W
        ]
    }

    /// The 8 neighbors (cardinals plus diagonals).
    #[inline]
    pub fn neighbors_8(&self) -> [GridCoord; 8] {
        [
            GridCoord::new(self.row - 1, self.col),     // N
            GridCoord::new(self.row - 1, self.col + 1), // NE
            GridCoord::new(self.row, self.col + 1),     // E
            GridCoord::new(self.row + 1, self.col + 1), // SE
            GridCoord::new(self.row + 1, self.col),     // S
            GridCoord::new(self.row + 1, self.col - 1), // SW
            GridCoord::new(self.row, self.col - 1),     // W
            GridCoord::new(self.row - 1, self.col - 1), // NW
        ]
    }
}

impl Add for GridCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        GridCoord::new(self.row + other.row, self.col + other.col)
    }
}

impl Sub for GridCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        GridCoord::new(self.row - other.row, self.col - other.col)
    }
}
