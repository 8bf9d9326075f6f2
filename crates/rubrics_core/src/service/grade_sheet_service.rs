//! Grade-sheet import use-case service.
//!
//! # Responsibility
//! - Parse a whole sheet, pick the create or update path for one
//!   (attempt, revision), and persist the resulting plan in one batch.
//!
//! # Invariants
//! - The whole sheet is parsed before any store access.
//! - A failed import writes nothing.
//! - Imports for the same (attempt, revision) must be serialized by the
//!   caller.

use crate::grading::reconcile::{plan_marks_update, reconcile, MarksPlan, ReconcileError};
use crate::grading::sheet::{parse_rows, GradeSheetError, GradeSheetRow};
use crate::model::catalog::{AttemptId, GradingRevisionId};
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from grade-sheet import.
#[derive(Debug)]
pub enum ImportError {
    /// A row could not be parsed.
    Sheet(GradeSheetError),
    /// Rows could not be merged into the ledger.
    Reconcile(ReconcileError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sheet(err) => write!(f, "malformed grading sheet: {err}"),
            Self::Reconcile(err) => write!(f, "cannot reconcile marks: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sheet(err) => Some(err),
            Self::Reconcile(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<GradeSheetError> for ImportError {
    fn from(value: GradeSheetError) -> Self {
        Self::Sheet(value)
    }
}

impl From<ReconcileError> for ImportError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Which ledger path an import took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPath {
    /// No entries existed; new entries were inserted.
    Created,
    /// Entries existed; their marks were rewritten.
    Updated,
}

impl ImportPath {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Updated => "update",
        }
    }
}

/// Outcome of one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub path: ImportPath,
    /// Data rows read, header excluded.
    pub rows_read: usize,
    /// Rows that contributed to no rubric.
    pub rows_skipped: usize,
    /// Ledger entries inserted or re-marked.
    pub entries_written: usize,
}

/// Grade-sheet import facade over a ledger repository.
pub struct GradeSheetService<L: LedgerRepository> {
    ledger: L,
}

impl<L: LedgerRepository> GradeSheetService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Imports raw data rows (header already dropped) for one attempt and
    /// revision.
    ///
    /// Uses the create path when the ledger holds nothing for this
    /// (attempt, revision), and the update path otherwise.
    pub fn import_grade_sheet<I, R, S>(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
        raw_rows: I,
    ) -> Result<ImportSummary, ImportError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let started_at = Instant::now();
        info!(
            "event=grade_sheet_import module=service status=start attempt_id={attempt_id} revision_id={revision_id}"
        );

        let result = self.import_parsed(attempt_id, revision_id, raw_rows);
        match &result {
            Ok(summary) => info!(
                "event=grade_sheet_import module=service status=ok attempt_id={attempt_id} revision_id={revision_id} path={} rows={} skipped={} entries={} duration_ms={}",
                summary.path.as_str(),
                summary.rows_read,
                summary.rows_skipped,
                summary.entries_written,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=grade_sheet_import module=service status=error attempt_id={attempt_id} revision_id={revision_id} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Create path: inserts one entry per rubric named in `rows`.
    ///
    /// Returns the number of entries inserted.
    pub fn store_marks_for_revision(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
        rows: &[GradeSheetRow],
    ) -> Result<usize, ImportError> {
        let plan = reconcile(Vec::new(), rows, attempt_id, revision_id)?;
        self.persist(&plan)
    }

    /// Update path: rewrites marks of the existing entries named in `rows`.
    ///
    /// Fails with `ReconcileError::UnknownRubric` when a row names a rubric
    /// that has no entry for this (attempt, revision). Returns the number of
    /// entries re-marked.
    pub fn update_marks_for_revision(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
        rows: &[GradeSheetRow],
    ) -> Result<usize, ImportError> {
        let existing = self.ledger.list_entries(attempt_id, revision_id)?;
        let plan = MarksPlan {
            to_create: Vec::new(),
            to_update: plan_marks_update(existing, rows)?,
        };
        self.persist(&plan)
    }

    /// Writes one plan and returns the number of entries it touched.
    fn persist(&self, plan: &MarksPlan) -> Result<usize, ImportError> {
        if !plan.to_create.is_empty() {
            self.ledger.create_entries(&plan.to_create)?;
        }
        if !plan.to_update.is_empty() {
            self.ledger.update_marks(&plan.to_update)?;
        }
        Ok(plan.to_create.len() + plan.to_update.len())
    }

    fn import_parsed<I, R, S>(
        &self,
        attempt_id: AttemptId,
        revision_id: GradingRevisionId,
        raw_rows: I,
    ) -> Result<ImportSummary, ImportError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let rows = parse_rows(raw_rows)?;
        let rows_skipped = rows.iter().filter(|row| !row.is_active()).count();

        let existing = self.ledger.list_entries(attempt_id, revision_id)?;
        let path = if existing.is_empty() {
            ImportPath::Created
        } else {
            ImportPath::Updated
        };
        let plan = reconcile(existing, &rows, attempt_id, revision_id)?;
        let entries_written = self.persist(&plan)?;

        Ok(ImportSummary {
            path,
            rows_read: rows.len(),
            rows_skipped,
            entries_written,
        })
    }
}
