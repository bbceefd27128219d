//! Core domain logic for the kinship family-tree builder.
//! This crate is the single source of truth for relationship invariants,
//! generational layout and render projection.

pub mod db;
pub mod ids;
pub mod layout;
pub mod logging;
pub mod model;
pub mod projection;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use ids::{Clock, FixedClock, IdGenerator, SequentialIdGenerator, SystemClock, UuidIdGenerator};
pub use layout::{compute_layout, LayoutConfig, Orientation, Position, TreeLayout};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::person::{Gender, Person, PersonDraft, PersonId, PersonPatch, PersonValidationError};
pub use model::tree::{
    FamilyTree, RelationshipKind, RelativeRole, Relatives, RepairReport, TreeError, TreeId,
    TreeResult,
};
pub use projection::{
    project, render_tree, EdgeKind, EdgeStyle, LineStyle, RenderEdge, RenderNode,
    RenderProjection, Side,
};
pub use repo::tree_store::{MemoryTreeStore, SqliteTreeStore, StoreError, StoreResult, TreeStore};
pub use service::registry::{FamilyRegistry, RegistryError, RegistryResult};
pub use snapshot::{
    export_tree, import_tree, read_snapshot_file, sanitize_tree, snapshot_file_name,
    write_snapshot_file, ImportedTree, SnapshotError, SnapshotResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
