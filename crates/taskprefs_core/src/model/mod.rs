//! Domain model for tasks and user preferences.
//!
//! # Responsibility
//! - Define canonical data structures shared by store, repo and service layers.

pub mod settings;
pub mod task;
