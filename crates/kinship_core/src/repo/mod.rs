//! Persistence collaborators for family trees.
//!
//! # Responsibility
//! - Define the `load`/`save` contract over the full set of trees.
//! - Keep SQLite details out of the registry and model.
//!
//! # Invariants
//! - `save` followed by `load` returns the same trees in the same order.
//! - Loaded trees pass snapshot validation before they are returned.

pub mod tree_store;
