//! Repository layer over preference and task sources.
//!
//! # Responsibility
//! - Turn raw store entries into typed settings and typed errors.
//! - Define the task source contract consumed by UI composition.
//!
//! # Invariants
//! - Repositories return semantic errors (`InvalidData`) in addition to
//!   store transport errors.

pub mod preferences_repo;
pub mod task_repo;
