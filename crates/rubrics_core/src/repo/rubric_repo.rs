//! Rubric graph repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist rubric trees, rubric nodes and parent -> child edges.
//! - Answer the "edges touching a rubric set" query used by the graph
//!   serializer.
//!
//! # Invariants
//! - Edges only connect rubrics that belong to the edge's tree.
//! - Listing is deterministic: `id ASC`.
//! - Edge lookups bind each rubric id once, in bounded chunks.

use super::{
    bool_from_db, ensure_connection_ready, marks_from_db, placeholders, RepoError, RepoResult,
};
use crate::model::rubric::{NewRubric, Rubric, RubricEdge, RubricId, RubricTreeId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

/// Ids bound per edge lookup statement, well under SQLite's variable limit.
const EDGE_LOOKUP_CHUNK: usize = 500;

const RUBRIC_SELECT_SQL: &str = "SELECT
    id,
    tree_id,
    name,
    max_marks,
    grading_guidelines,
    is_leaf
FROM rubrics";

const EDGE_SELECT_SQL: &str = "SELECT
    id,
    tree_id,
    src_rubric_id,
    dest_rubric_id
FROM rubric_edges";

/// Repository interface for the rubric graph store.
pub trait RubricRepository {
    /// Creates an empty rubric tree.
    fn create_tree(&self) -> RepoResult<RubricTreeId>;
    /// Creates one rubric node inside an existing tree.
    fn create_rubric(&self, rubric: &NewRubric) -> RepoResult<Rubric>;
    /// Connects `src_rubric_id -> dest_rubric_id` inside `tree_id`.
    fn create_edge(
        &self,
        tree_id: RubricTreeId,
        src_rubric_id: RubricId,
        dest_rubric_id: RubricId,
    ) -> RepoResult<RubricEdge>;
    /// Loads one rubric by id.
    fn get_rubric(&self, id: RubricId) -> RepoResult<Option<Rubric>>;
    /// Lists all rubrics of one tree.
    fn list_rubrics(&self, tree_id: RubricTreeId) -> RepoResult<Vec<Rubric>>;
    /// Lists every edge whose source or destination is in `rubric_ids`.
    fn list_edges_touching(&self, rubric_ids: &[RubricId]) -> RepoResult<Vec<RubricEdge>>;
}

/// SQLite-backed rubric graph repository.
pub struct SqliteRubricRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRubricRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["rubric_trees", "rubrics", "rubric_edges"])?;
        Ok(Self { conn })
    }

    fn ensure_tree_exists(&self, tree_id: RubricTreeId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM rubric_trees WHERE id = ?1);",
            [tree_id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound {
                entity: "rubric tree",
                id: tree_id,
            });
        }
        Ok(())
    }

    fn ensure_rubric_in_tree(&self, tree_id: RubricTreeId, rubric_id: RubricId) -> RepoResult<()> {
        let rubric = self.get_rubric(rubric_id)?.ok_or(RepoError::NotFound {
            entity: "rubric",
            id: rubric_id,
        })?;
        if rubric.tree_id != tree_id {
            return Err(RepoError::TreeMismatch {
                tree_id,
                rubric_id,
                rubric_tree_id: rubric.tree_id,
            });
        }
        Ok(())
    }
}

impl RubricRepository for SqliteRubricRepository<'_> {
    fn create_tree(&self) -> RepoResult<RubricTreeId> {
        self.conn
            .execute("INSERT INTO rubric_trees DEFAULT VALUES;", [])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_rubric(&self, rubric: &NewRubric) -> RepoResult<Rubric> {
        self.ensure_tree_exists(rubric.tree_id)?;
        self.conn.execute(
            "INSERT INTO rubrics (
                tree_id,
                name,
                max_marks,
                grading_guidelines,
                is_leaf
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                rubric.tree_id,
                rubric.name.as_str(),
                rubric.max_marks,
                rubric.grading_guidelines.as_str(),
                rubric.is_leaf,
            ],
        )?;

        Ok(Rubric {
            id: self.conn.last_insert_rowid(),
            tree_id: rubric.tree_id,
            name: rubric.name.clone(),
            max_marks: rubric.max_marks,
            grading_guidelines: rubric.grading_guidelines.clone(),
            is_leaf: rubric.is_leaf,
        })
    }

    fn create_edge(
        &self,
        tree_id: RubricTreeId,
        src_rubric_id: RubricId,
        dest_rubric_id: RubricId,
    ) -> RepoResult<RubricEdge> {
        self.ensure_tree_exists(tree_id)?;
        self.ensure_rubric_in_tree(tree_id, src_rubric_id)?;
        self.ensure_rubric_in_tree(tree_id, dest_rubric_id)?;

        self.conn.execute(
            "INSERT INTO rubric_edges (tree_id, src_rubric_id, dest_rubric_id)
             VALUES (?1, ?2, ?3);",
            params![tree_id, src_rubric_id, dest_rubric_id],
        )?;

        Ok(RubricEdge {
            id: self.conn.last_insert_rowid(),
            tree_id,
            src_rubric_id,
            dest_rubric_id,
        })
    }

    fn get_rubric(&self, id: RubricId) -> RepoResult<Option<Rubric>> {
        let rubric = self
            .conn
            .query_row(
                &format!("{RUBRIC_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_rubric_row(row)),
            )
            .optional()?;
        rubric.transpose()
    }

    fn list_rubrics(&self, tree_id: RubricTreeId) -> RepoResult<Vec<Rubric>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RUBRIC_SELECT_SQL} WHERE tree_id = ?1 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([tree_id])?;
        let mut rubrics = Vec::new();
        while let Some(row) = rows.next()? {
            rubrics.push(parse_rubric_row(row)?);
        }
        Ok(rubrics)
    }

    fn list_edges_touching(&self, rubric_ids: &[RubricId]) -> RepoResult<Vec<RubricEdge>> {
        let mut edges = BTreeMap::new();
        for chunk in rubric_ids.chunks(EDGE_LOOKUP_CHUNK) {
            let in_list = placeholders(chunk.len());
            let sql = format!(
                "{EDGE_SELECT_SQL}
                 WHERE src_rubric_id IN ({in_list})
                    OR dest_rubric_id IN ({in_list});"
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk))?;
            while let Some(row) = rows.next()? {
                let edge = RubricEdge {
                    id: row.get("id")?,
                    tree_id: row.get("tree_id")?,
                    src_rubric_id: row.get("src_rubric_id")?,
                    dest_rubric_id: row.get("dest_rubric_id")?,
                };
                edges.insert(edge.id, edge);
            }
        }
        Ok(edges.into_values().collect())
    }
}

fn parse_rubric_row(row: &Row<'_>) -> RepoResult<Rubric> {
    let max_marks = marks_from_db(row.get("max_marks")?, "rubrics.max_marks")?;
    if max_marks == 0 {
        return Err(RepoError::InvalidData(
            "rubrics.max_marks must be positive".to_string(),
        ));
    }

    Ok(Rubric {
        id: row.get("id")?,
        tree_id: row.get("tree_id")?,
        name: row.get("name")?,
        max_marks,
        grading_guidelines: row.get("grading_guidelines")?,
        is_leaf: bool_from_db(row.get("is_leaf")?, "rubrics.is_leaf")?,
    })
}
