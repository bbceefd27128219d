//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate tree aggregates, id/clock collaborators and snapshot I/O
//!   into use-case level APIs.
//! - Keep UI/CLI layers decoupled from storage details.

pub mod registry;
