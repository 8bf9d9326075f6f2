//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define data access contracts for the rubric graph, grading catalog and
//!   marks ledger.
//! - Keep SQL details out of the reconciler and services.
//!
//! # Invariants
//! - Repositories refuse connections whose schema is not fully migrated.
//! - Batch writes run in one immediate transaction and are all-or-nothing.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to DB transport errors.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::catalog::CatalogValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_repo;
pub mod ledger_repo;
pub mod rubric_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every grading store.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Input rejected before reaching SQL.
    Validation(CatalogValidationError),
    /// Referenced record does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// A unique name is already taken.
    Duplicate { entity: &'static str, name: String },
    /// Edge endpoint belongs to a different rubric tree than the edge.
    TreeMismatch {
        tree_id: i64,
        rubric_id: i64,
        rubric_tree_id: i64,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate { entity, name } => write!(f, "{entity} already exists: `{name}`"),
            Self::TreeMismatch {
                tree_id,
                rubric_id,
                rubric_tree_id,
            } => write!(
                f,
                "rubric {rubric_id} belongs to tree {rubric_tree_id}, not tree {tree_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "grading repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "grading repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid grading data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CatalogValidationError> for RepoError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Checks schema version and required tables before a repository is built.
fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Builds `?1, ?2, ...` for an `IN (...)` list of `count` values. Numbered
/// parameters let one bound list serve several `IN` clauses.
fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn marks_from_db(value: i64, column: &'static str) -> RepoResult<u16> {
    u16::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid marks value `{value}` in {column}")))
}

fn bool_from_db(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{bool_from_db, marks_from_db, placeholders};

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(1), "?1");
        assert_eq!(placeholders(3), "?1, ?2, ?3");
    }

    #[test]
    fn marks_from_db_rejects_negative_and_oversized_values() {
        assert_eq!(marks_from_db(7, "t.marks").unwrap(), 7);
        assert!(marks_from_db(-1, "t.marks").is_err());
        assert!(marks_from_db(70_000, "t.marks").is_err());
    }

    #[test]
    fn bool_from_db_accepts_only_zero_and_one() {
        assert!(!bool_from_db(0, "t.flag").unwrap());
        assert!(bool_from_db(1, "t.flag").unwrap());
        assert!(bool_from_db(2, "t.flag").is_err());
    }
}
