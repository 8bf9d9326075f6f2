//! Marks ledger model.
//!
//! # Responsibility
//! - Describe one `(attempt, rubric, revision) -> marks` record and the
//!   joined read model consumed by the graph serializer.
//!
//! # Invariants
//! - `id` is `None` only for entries not yet inserted.
//! - Marks are not bounded by the rubric's `max_marks` at write time.

use crate::model::catalog::{AttemptId, GradingRevisionId};
use crate::model::rubric::RubricId;
use serde::{Deserialize, Serialize};

/// Row id of a `marks_rubric_attempts` record.
pub type LedgerEntryId = i64;

/// Marks awarded for one rubric of one attempt in one grading revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Option<LedgerEntryId>,
    pub attempt_id: AttemptId,
    pub rubric_id: RubricId,
    pub revision_id: GradingRevisionId,
    pub marks: u16,
}

impl LedgerEntry {
    /// Builds an entry that has not been persisted yet.
    pub fn pending(
        attempt_id: AttemptId,
        rubric_id: RubricId,
        revision_id: GradingRevisionId,
        marks: u16,
    ) -> Self {
        Self {
            id: None,
            attempt_id,
            rubric_id,
            revision_id,
            marks,
        }
    }
}

/// Ledger entry joined with the rubric metadata needed for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricMarks {
    pub entry_id: LedgerEntryId,
    pub rubric_id: RubricId,
    pub marks: u16,
    pub rubric_name: String,
    pub max_marks: u16,
}
