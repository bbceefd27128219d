//! Genealogy domain model.
//!
//! # Responsibility
//! - Define persons and the family tree aggregate that owns them.
//! - Keep every relationship mutation inside the aggregate so symmetry and
//!   referential integrity are enforced in one place.
//!
//! # Invariants
//! - Every person is identified by a stable `PersonId` and belongs to
//!   exactly one tree.
//! - Relationship graphs may contain cycles; nothing here rejects them.

pub mod person;
pub mod tree;
