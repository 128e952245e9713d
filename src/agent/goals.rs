//! Prioritized goal queue.
//!
//! Goals carry an integer priority (higher = more urgent); ties are broken
//! by insertion order. A goal, once completed — visited or skipped as
//! unreachable — is never reconsidered.

use crate::core::GridCoord;

/// One navigation target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Goal {
    /// Target cell.
    pub coord: GridCoord,
    /// Higher is more urgent.
    pub priority: i32,
    /// Insertion sequence, used to break priority ties.
    seq: u64,
}

/// A completed goal and whether the agent actually stood on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletedGoal {
    pub goal: Goal,
    /// False when the goal was skipped as unreachable.
    pub visited: bool,
}

/// Pending and completed goals.
#[derive(Clone, Debug, Default)]
pub struct GoalQueue {
    pending: Vec<Goal>,
    completed: Vec<CompletedGoal>,
    next_seq: u64,
}

impl GoalQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from `(coord, priority)` pairs in insertion order.
    pub fn from_markers(markers: &[(GridCoord, i32)]) -> Self {
        let mut queue = Self::new();
        for (coord, priority) in markers {
            queue.push(*coord, *priority);
        }
        queue
    }

    /// Add a goal.
    pub fn push(&mut self, coord: GridCoord, priority: i32) {
        self.pending.push(Goal {
            coord,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// The most urgent pending goal: highest priority, then earliest
    /// insertion.
    pub fn select(&self) -> Option<Goal> {
        self.pending
            .iter()
            .copied()
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.seq.cmp(&a.seq)))
    }

    /// Move a goal to the completed set.
    pub fn complete(&mut self, coord: GridCoord, visited: bool) {
        if let Some(pos) = self.pending.iter().position(|g| g.coord == coord) {
            let goal = self.pending.remove(pos);
            self.completed.push(CompletedGoal { goal, visited });
        }
    }

    /// Number of goals not yet completed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Number of completed goals (visited or skipped).
    #[inline]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Completed goals in completion order.
    #[inline]
    pub fn completed(&self) -> &[CompletedGoal] {
        &self.completed
    }

    /// Pending goals in insertion order.
    #[inline]
    pub fn pending(&self) -> &[Goal] {
        &self.pending
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
