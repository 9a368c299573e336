//! Task domain model.
//!
//! # Responsibility
//! - Define the task record consumed by UI composition.
//!
//! # Invariants
//! - Tasks are immutable from the core's perspective; the task source owns them.
//! - `TaskPriority` orders `High < Medium < Low`, so ascending sort puts the
//!   most urgent task first.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable task identifier.
pub type TaskId = Uuid;

/// Task urgency. Declaration order defines sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

/// Task record supplied by a task source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub deadline: i64,
    pub priority: TaskPriority,
    pub completed: bool,
}

impl Task {
    /// Creates a task with a generated stable ID.
    pub fn new(
        name: impl Into<String>,
        deadline: i64,
        priority: TaskPriority,
        completed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            deadline,
            priority,
            completed,
        }
    }
}
