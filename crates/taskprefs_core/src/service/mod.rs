//! Core use-case services.
//!
//! # Responsibility
//! - Compose repository outputs into presentation-ready models.
//! - Keep presentation layers decoupled from store details.

pub mod tasks_view;
