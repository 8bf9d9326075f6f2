//! Grading catalog repository: revisions, students, questions and attempts.
//!
//! # Responsibility
//! - Persist the identity records the marks ledger references.
//!
//! # Invariants
//! - Revision names are validated and unique before insert.
//! - An attempt's rubric tree is fixed at creation.

use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::catalog::{
    normalize_revision_name, normalize_username, Attempt, AttemptId, GradingRevision,
    GradingRevisionId, Question, QuestionId, Student, StudentId,
};
use crate::model::rubric::RubricTreeId;
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for catalog records.
pub trait CatalogRepository {
    /// Creates a grading revision with a unique name.
    fn create_revision(&self, name: &str) -> RepoResult<GradingRevision>;
    /// Finds a revision by exact (trimmed) name.
    fn find_revision_by_name(&self, name: &str) -> RepoResult<Option<GradingRevision>>;
    /// Loads one revision by id.
    fn get_revision(&self, id: GradingRevisionId) -> RepoResult<Option<GradingRevision>>;
    /// Lists revisions in creation order.
    fn list_revisions(&self) -> RepoResult<Vec<GradingRevision>>;
    /// Creates a student record.
    fn create_student(&self, username: &str) -> RepoResult<Student>;
    /// Finds a student by exact (trimmed) username.
    fn find_student_by_username(&self, username: &str) -> RepoResult<Option<Student>>;
    /// Creates a question owning `rubric_tree_id`.
    fn create_question(&self, q_text: &str, rubric_tree_id: RubricTreeId)
        -> RepoResult<Question>;
    /// Creates an attempt pinned to `rubric_tree_id`.
    fn create_attempt(
        &self,
        student_id: StudentId,
        question_id: QuestionId,
        rubric_tree_id: RubricTreeId,
    ) -> RepoResult<Attempt>;
    /// Loads one attempt by id.
    fn get_attempt(&self, id: AttemptId) -> RepoResult<Option<Attempt>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["grading_revisions", "students", "questions", "attempts"],
        )?;
        Ok(Self { conn })
    }

    fn ensure_exists(&self, table: &'static str, entity: &'static str, id: i64) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
            [id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound { entity, id });
        }
        Ok(())
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_revision(&self, name: &str) -> RepoResult<GradingRevision> {
        let name = normalize_revision_name(name)?;
        if self.find_revision_by_name(&name)?.is_some() {
            return Err(RepoError::Duplicate {
                entity: "grading revision",
                name,
            });
        }

        self.conn.execute(
            "INSERT INTO grading_revisions (name) VALUES (?1);",
            [name.as_str()],
        )?;
        Ok(GradingRevision {
            id: self.conn.last_insert_rowid(),
            name,
        })
    }

    fn find_revision_by_name(&self, name: &str) -> RepoResult<Option<GradingRevision>> {
        let revision = self
            .conn
            .query_row(
                "SELECT id, name FROM grading_revisions WHERE name = ?1;",
                [name.trim()],
                |row| {
                    Ok(GradingRevision {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(revision)
    }

    fn get_revision(&self, id: GradingRevisionId) -> RepoResult<Option<GradingRevision>> {
        let revision = self
            .conn
            .query_row(
                "SELECT id, name FROM grading_revisions WHERE id = ?1;",
                [id],
                |row| {
                    Ok(GradingRevision {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(revision)
    }

    fn list_revisions(&self) -> RepoResult<Vec<GradingRevision>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM grading_revisions ORDER BY id ASC;")?;
        let revisions = stmt
            .query_map([], |row| {
                Ok(GradingRevision {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revisions)
    }

    fn create_student(&self, username: &str) -> RepoResult<Student> {
        let username = normalize_username(username)?;
        if self.find_student_by_username(&username)?.is_some() {
            return Err(RepoError::Duplicate {
                entity: "student",
                name: username,
            });
        }

        self.conn.execute(
            "INSERT INTO students (username) VALUES (?1);",
            [username.as_str()],
        )?;
        Ok(Student {
            id: self.conn.last_insert_rowid(),
            username,
        })
    }

    fn find_student_by_username(&self, username: &str) -> RepoResult<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, username FROM students WHERE username = ?1;",
                [username.trim()],
                |row| {
                    Ok(Student {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    fn create_question(
        &self,
        q_text: &str,
        rubric_tree_id: RubricTreeId,
    ) -> RepoResult<Question> {
        self.ensure_exists("rubric_trees", "rubric tree", rubric_tree_id)?;
        self.conn.execute(
            "INSERT INTO questions (q_text, rubric_tree_id) VALUES (?1, ?2);",
            params![q_text, rubric_tree_id],
        )?;
        Ok(Question {
            id: self.conn.last_insert_rowid(),
            q_text: q_text.to_string(),
            rubric_tree_id,
        })
    }

    fn create_attempt(
        &self,
        student_id: StudentId,
        question_id: QuestionId,
        rubric_tree_id: RubricTreeId,
    ) -> RepoResult<Attempt> {
        self.ensure_exists("students", "student", student_id)?;
        self.ensure_exists("questions", "question", question_id)?;
        self.ensure_exists("rubric_trees", "rubric tree", rubric_tree_id)?;

        self.conn.execute(
            "INSERT INTO attempts (student_id, question_id, rubric_tree_id)
             VALUES (?1, ?2, ?3);",
            params![student_id, question_id, rubric_tree_id],
        )?;
        Ok(Attempt {
            id: self.conn.last_insert_rowid(),
            student_id,
            question_id,
            rubric_tree_id,
        })
    }

    fn get_attempt(&self, id: AttemptId) -> RepoResult<Option<Attempt>> {
        let attempt = self
            .conn
            .query_row(
                "SELECT id, student_id, question_id, rubric_tree_id
                 FROM attempts
                 WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Attempt {
                        id: row.get(0)?,
                        student_id: row.get(1)?,
                        question_id: row.get(2)?,
                        rubric_tree_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(attempt)
    }
}
