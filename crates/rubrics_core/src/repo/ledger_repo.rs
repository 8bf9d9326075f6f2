//! Marks ledger repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Look up ledger entries by (attempt, revision).
//! - Insert or re-mark many entries in one batch.
//! - Join entries with rubric metadata for one (student, question, revision).
//!
//! # Invariants
//! - `create_entries` and `update_marks` are all-or-nothing.
//! - `update_marks` only writes `marks` (and the `updated_at` stamp).
//! - Ledger rows are never deleted here.

use super::{ensure_connection_ready, marks_from_db, RepoError, RepoResult};
use crate::model::catalog::{AttemptId, GradingRevisionId, QuestionId, StudentId};
use crate::model::ledger::{LedgerEntry, LedgerEntryId, RubricMarks};
use log::{error, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;

/// Repository interface for the marks ledger.
pub trait LedgerRepository {
    /// Lists all entries recorded for one attempt in one revision.
    fn list_entries(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
    ) -> RepoResult<Vec<LedgerEntry>>;
    /// Inserts all entries in one transaction and returns their new ids in
    /// input order.
    fn create_entries(&self, entries: &[LedgerEntry]) -> RepoResult<Vec<LedgerEntryId>>;
    /// Writes the `marks` field of already persisted entries in one
    /// transaction.
    fn update_marks(&self, entries: &[LedgerEntry]) -> RepoResult<()>;
    /// Lists entries of every attempt by `student_id` at `question_id` in
    /// `revision_id`, joined with rubric name and max marks.
    fn list_rubric_marks(
        &self,
        student_id: StudentId,
        question_id: QuestionId,
        revision_id: GradingRevisionId,
    ) -> RepoResult<Vec<RubricMarks>>;
}

/// SQLite-backed marks ledger repository.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["marks_rubric_attempts", "attempts", "rubrics"])?;
        Ok(Self { conn })
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn list_entries(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
    ) -> RepoResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, attempt_id, rubric_id, revision_id, marks
             FROM marks_rubric_attempts
             WHERE attempt_id = ?1
               AND revision_id = ?2
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query(params![attempt_id, revision_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn create_entries(&self, entries: &[LedgerEntry]) -> RepoResult<Vec<LedgerEntryId>> {
        let started_at = Instant::now();
        let result = insert_entries(self.conn, entries);
        log_batch("ledger_create", entries.len(), started_at, &result);
        result
    }

    fn update_marks(&self, entries: &[LedgerEntry]) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = write_marks(self.conn, entries);
        log_batch("ledger_update", entries.len(), started_at, &result);
        result
    }

    fn list_rubric_marks(
        &self,
        student_id: StudentId,
        question_id: QuestionId,
        revision_id: GradingRevisionId,
    ) -> RepoResult<Vec<RubricMarks>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.id AS entry_id,
                m.rubric_id AS rubric_id,
                m.marks AS marks,
                r.name AS rubric_name,
                r.max_marks AS max_marks
             FROM marks_rubric_attempts m
             INNER JOIN attempts a ON a.id = m.attempt_id
             INNER JOIN rubrics r ON r.id = m.rubric_id
             WHERE a.student_id = ?1
               AND a.question_id = ?2
               AND m.revision_id = ?3
             ORDER BY m.id ASC;",
        )?;
        let mut rows = stmt.query(params![student_id, question_id, revision_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(RubricMarks {
                entry_id: row.get("entry_id")?,
                rubric_id: row.get("rubric_id")?,
                marks: marks_from_db(row.get("marks")?, "marks_rubric_attempts.marks")?,
                rubric_name: row.get("rubric_name")?,
                max_marks: marks_from_db(row.get("max_marks")?, "rubrics.max_marks")?,
            });
        }
        Ok(items)
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<LedgerEntry> {
    Ok(LedgerEntry {
        id: Some(row.get("id")?),
        attempt_id: row.get("attempt_id")?,
        rubric_id: row.get("rubric_id")?,
        revision_id: row.get("revision_id")?,
        marks: marks_from_db(row.get("marks")?, "marks_rubric_attempts.marks")?,
    })
}

fn insert_entries(conn: &Connection, entries: &[LedgerEntry]) -> RepoResult<Vec<LedgerEntryId>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut ids = Vec::with_capacity(entries.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO marks_rubric_attempts (attempt_id, rubric_id, revision_id, marks)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for entry in entries {
            if let Some(id) = entry.id {
                return Err(RepoError::InvalidData(format!(
                    "ledger entry {id} is already persisted"
                )));
            }
            stmt.execute(params![
                entry.attempt_id,
                entry.rubric_id,
                entry.revision_id,
                entry.marks,
            ])?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;
    Ok(ids)
}

fn write_marks(conn: &Connection, entries: &[LedgerEntry]) -> RepoResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    {
        let mut stmt = tx.prepare(
            "UPDATE marks_rubric_attempts
             SET marks = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
        )?;
        for entry in entries {
            let id = entry.id.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "ledger entry for rubric {} has no id",
                    entry.rubric_id
                ))
            })?;
            if stmt.execute(params![id, entry.marks])? == 0 {
                return Err(RepoError::NotFound {
                    entity: "ledger entry",
                    id,
                });
            }
        }
    }
    tx.commit()?;
    Ok(())
}

fn log_batch<T>(event: &str, count: usize, started_at: Instant, result: &RepoResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=repo status=ok entries={count} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error entries={count} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}
