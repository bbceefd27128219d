//! SQLite backing for `SqliteTreeStore`.
//!
//! # Responsibility
//! - Open connections with foreign keys on, so deleting a tree row also
//!   drops its `tree_persons` entries.
//! - Bring the family-tree schema up to `migrations::latest_version()`.
//!
//! # Invariants
//! - A connection handed out by `open_db*` is fully migrated.
//! - A database written by a newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Connection or schema failure below the tree store.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Database `user_version` is ahead of this build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "family tree database is at schema {db_version}, this build supports up to {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
