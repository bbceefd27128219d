//! Snapshot import/export for one family tree.
//!
//! # Responsibility
//! - Serialize a tree to the JSON snapshot format and back.
//! - Treat imported JSON as untrusted: check shape, then repair invariants.
//!
//! # Invariants
//! - A failed import has no side effects.
//! - Imported trees satisfy every aggregate invariant.

use crate::model::tree::{FamilyTree, RepairReport};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_FILE_STEM: &str = "family-tree";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug)]
pub enum SnapshotError {
    /// Input is not a valid tree snapshot.
    MalformedSnapshot(String),
    /// Snapshot file could not be read or written.
    Io(std::io::Error),
    /// Tree could not be encoded.
    Encode(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSnapshot(message) => write!(f, "malformed snapshot: {message}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedSnapshot(_) => None,
            Self::Io(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A validated, repaired import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTree {
    pub tree: FamilyTree,
    pub repairs: RepairReport,
}

/// Encodes `tree` as pretty-printed snapshot JSON.
pub fn export_tree(tree: &FamilyTree) -> SnapshotResult<String> {
    serde_json::to_string_pretty(tree).map_err(SnapshotError::Encode)
}

/// Parses and validates snapshot JSON, then repairs aggregate invariants.
pub fn import_tree(json: &str) -> SnapshotResult<ImportedTree> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| SnapshotError::MalformedSnapshot(format!("invalid JSON: {err}")))?;
    import_value(value)
}

/// Same as `import_tree` for an already parsed JSON value.
pub fn import_value(value: Value) -> SnapshotResult<ImportedTree> {
    if !value.is_object() {
        return Err(SnapshotError::MalformedSnapshot(
            "top-level value must be an object".to_string(),
        ));
    }

    let tree: FamilyTree = serde_json::from_value(value)
        .map_err(|err| SnapshotError::MalformedSnapshot(err.to_string()))?;
    sanitize_tree(tree)
}

/// Validates a decoded tree and repairs its relationship invariants.
///
/// Every path that brings a tree in from outside the registry (snapshot
/// files, stores) goes through here. Blank tree or person ids and blank
/// names are rejected; everything else is repaired and counted.
pub fn sanitize_tree(mut tree: FamilyTree) -> SnapshotResult<ImportedTree> {
    if tree.id().as_str().trim().is_empty() {
        return Err(SnapshotError::MalformedSnapshot(
            "tree id must not be blank".to_string(),
        ));
    }
    if tree
        .persons()
        .iter()
        .any(|person| person.id.as_str().trim().is_empty())
    {
        return Err(SnapshotError::MalformedSnapshot(
            "person id must not be blank".to_string(),
        ));
    }
    if let Some(person) = tree.persons().iter().find(|person| person.validate().is_err()) {
        return Err(SnapshotError::MalformedSnapshot(format!(
            "person {} has a blank name",
            person.id
        )));
    }

    let repairs = tree.repair();
    if repairs.is_clean() {
        info!(
            "event=snapshot_import module=snapshot status=ok tree_id={} persons={}",
            tree.id(),
            tree.len()
        );
    } else {
        warn!(
            "event=snapshot_import module=snapshot status=repaired tree_id={} persons={} dangling={} self={} duplicate={} mirrored={} duplicate_persons={}",
            tree.id(),
            tree.len(),
            repairs.dangling_links,
            repairs.self_links,
            repairs.duplicate_links,
            repairs.mirrored_links,
            repairs.duplicate_persons
        );
    }

    Ok(ImportedTree { tree, repairs })
}

/// Suggested download name: whitespace runs become `_`, lowercased.
pub fn snapshot_file_name(tree: &FamilyTree) -> String {
    let stem = WHITESPACE_RE
        .replace_all(tree.name().trim(), "_")
        .to_lowercase();
    if stem.is_empty() {
        format!("{DEFAULT_FILE_STEM}.json")
    } else {
        format!("{stem}.json")
    }
}

pub fn write_snapshot_file(tree: &FamilyTree, path: impl AsRef<Path>) -> SnapshotResult<()> {
    let json = export_tree(tree)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_snapshot_file(path: impl AsRef<Path>) -> SnapshotResult<ImportedTree> {
    let json = std::fs::read_to_string(path)?;
    import_tree(&json)
}
