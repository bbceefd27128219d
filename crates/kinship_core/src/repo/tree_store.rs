//! Tree store contract with in-memory and SQLite implementations.
//!
//! # Responsibility
//! - Persist the whole set of trees keyed by tree id.
//! - Reject persisted payloads that no longer decode as valid trees.
//!
//! # Invariants
//! - `save` replaces the stored set atomically.
//! - Load order equals the order of the last `save`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::person::PersonId;
use crate::model::tree::{FamilyTree, TreeId};
use crate::snapshot::{import_value, SnapshotError};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from tree store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Tree could not be encoded for storage.
    Encode(serde_json::Error),
    /// Persisted data cannot be converted to a valid tree.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tree store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Encode(err) => write!(f, "failed to encode tree: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted tree data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for the full set of trees.
pub trait TreeStore {
    /// Returns every stored tree; empty when nothing was saved yet.
    fn load(&self) -> StoreResult<Vec<FamilyTree>>;
    /// Replaces the stored set with `trees`.
    fn save(&self, trees: &[FamilyTree]) -> StoreResult<()>;
}

/// Process-local store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTreeStore {
    trees: RefCell<Vec<FamilyTree>>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeStore for MemoryTreeStore {
    fn load(&self) -> StoreResult<Vec<FamilyTree>> {
        Ok(self.trees.borrow().clone())
    }

    fn save(&self, trees: &[FamilyTree]) -> StoreResult<()> {
        *self.trees.borrow_mut() = trees.to_vec();
        Ok(())
    }
}

/// SQLite-backed store: one row per tree with a JSON snapshot payload.
pub struct SqliteTreeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTreeStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Finds the tree that holds `person_id`, if any.
    pub fn tree_containing(&self, person_id: &PersonId) -> StoreResult<Option<TreeId>> {
        let tree_id: Option<String> = self
            .conn
            .query_row(
                "SELECT tree_id FROM tree_persons WHERE person_id = ?1 LIMIT 1;",
                [person_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(tree_id.map(TreeId::new))
    }
}

impl TreeStore for SqliteTreeStore<'_> {
    fn load(&self) -> StoreResult<Vec<FamilyTree>> {
        let mut stmt = self.conn.prepare(
            "SELECT tree_id, payload
             FROM family_trees
             ORDER BY position ASC, tree_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut trees = Vec::new();

        while let Some(row) = rows.next()? {
            let tree_id: String = row.get("tree_id")?;
            let payload: String = row.get("payload")?;
            let tree = decode_payload(&tree_id, &payload)?;
            trees.push(tree);
        }

        info!(
            "event=store_load module=repo status=ok trees={}",
            trees.len()
        );
        Ok(trees)
    }

    fn save(&self, trees: &[FamilyTree]) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM tree_persons;", [])?;
        tx.execute("DELETE FROM family_trees;", [])?;

        for (position, tree) in trees.iter().enumerate() {
            let payload = serde_json::to_string(tree).map_err(StoreError::Encode)?;
            tx.execute(
                "INSERT INTO family_trees (
                    tree_id,
                    name,
                    position,
                    payload,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    tree.id().as_str(),
                    tree.name(),
                    position as i64,
                    payload,
                    tree.created_at(),
                    tree.updated_at(),
                ],
            )?;
            for person in tree.persons() {
                tx.execute(
                    "INSERT INTO tree_persons (tree_id, person_id) VALUES (?1, ?2);",
                    params![tree.id().as_str(), person.id.as_str()],
                )?;
            }
        }
        tx.commit()?;

        info!(
            "event=store_save module=repo status=ok trees={}",
            trees.len()
        );
        Ok(())
    }
}

fn decode_payload(tree_id: &str, payload: &str) -> StoreResult<FamilyTree> {
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|err| {
        StoreError::InvalidData(format!("payload of tree `{tree_id}` is not JSON: {err}"))
    })?;
    let imported = import_value(value).map_err(|err| match err {
        SnapshotError::MalformedSnapshot(message) => {
            StoreError::InvalidData(format!("payload of tree `{tree_id}`: {message}"))
        }
        other => StoreError::InvalidData(other.to_string()),
    })?;

    if imported.tree.id().as_str() != tree_id {
        error!(
            "event=store_load module=repo status=error tree_id={} error_code=tree_id_mismatch",
            tree_id
        );
        return Err(StoreError::InvalidData(format!(
            "row `{tree_id}` holds payload for tree `{}`",
            imported.tree.id()
        )));
    }
    Ok(imported.tree)
}
