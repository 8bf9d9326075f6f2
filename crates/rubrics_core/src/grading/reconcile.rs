//! Mark reconciliation for one (attempt, revision) import.
//!
//! Within one call, the first row naming a rubric **sets** that rubric's
//! marks and every later row naming it **adds** to them. Stale marks are
//! therefore replaced on first touch while several rows can still spread
//! partial credit onto a shared parent rubric.
//!
//! # Invariants
//! - The create path yields at most one entry per rubric id.
//! - The update path never invents entries; an unknown rubric id aborts.
//! - Rubrics no row names are left out of the plan.

use crate::grading::sheet::GradeSheetRow;
use crate::model::catalog::{AttemptId, GradingRevisionId};
use crate::model::ledger::LedgerEntry;
use crate::model::rubric::RubricId;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised while merging rows into ledger entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Update path: a row names a rubric with no existing entry.
    UnknownRubric { rubric_id: RubricId, row: usize },
    /// Accumulated marks no longer fit the ledger column.
    MarksOverflow { rubric_id: RubricId, row: usize },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRubric { rubric_id, row } => write!(
                f,
                "row {row}: rubric {rubric_id} has no existing marks for this attempt and revision"
            ),
            Self::MarksOverflow { rubric_id, row } => {
                write!(f, "row {row}: accumulated marks for rubric {rubric_id} overflow")
            }
        }
    }
}

impl Error for ReconcileError {}

/// Ledger writes produced by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarksPlan {
    /// New entries, in first-touch order.
    pub to_create: Vec<LedgerEntry>,
    /// Existing entries with rewritten marks, in first-touch order.
    pub to_update: Vec<LedgerEntry>,
}

impl MarksPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touch {
    Unseen,
    Seen,
}

/// Per-call record of which rubrics already had their marks reset.
#[derive(Debug, Default)]
struct TouchLog {
    touches: HashMap<RubricId, Touch>,
}

impl TouchLog {
    /// Records a touch and returns the state the rubric was in before it.
    fn touch(&mut self, rubric_id: RubricId) -> Touch {
        self.touches
            .insert(rubric_id, Touch::Seen)
            .unwrap_or(Touch::Unseen)
    }
}

fn apply_marks(
    current: u16,
    incoming: u16,
    before: Touch,
    rubric_id: RubricId,
    row: usize,
) -> Result<u16, ReconcileError> {
    match before {
        Touch::Unseen => Ok(incoming),
        Touch::Seen => current
            .checked_add(incoming)
            .ok_or(ReconcileError::MarksOverflow { rubric_id, row }),
    }
}

/// Create path: builds one new entry per rubric named by any row.
pub fn plan_new_entries(
    attempt_id: AttemptId,
    revision_id: GradingRevisionId,
    rows: &[GradeSheetRow],
) -> Result<Vec<LedgerEntry>, ReconcileError> {
    let mut log = TouchLog::default();
    let mut entries: Vec<LedgerEntry> = Vec::new();
    let mut index_by_rubric: HashMap<RubricId, usize> = HashMap::new();

    for row in rows {
        for (rubric_id, marks) in row.contributions() {
            let before = log.touch(rubric_id);
            let index = *index_by_rubric.entry(rubric_id).or_insert_with(|| {
                entries.push(LedgerEntry::pending(attempt_id, rubric_id, revision_id, 0));
                entries.len() - 1
            });
            let entry = &mut entries[index];
            entry.marks = apply_marks(entry.marks, marks, before, rubric_id, row.row)?;
        }
    }

    Ok(entries)
}

/// Update path: rewrites marks of existing entries in place.
///
/// Returns only the entries some row touched. Every rubric a row names must
/// already have an entry in `existing`.
pub fn plan_marks_update(
    existing: Vec<LedgerEntry>,
    rows: &[GradeSheetRow],
) -> Result<Vec<LedgerEntry>, ReconcileError> {
    let index_by_rubric: HashMap<RubricId, usize> = existing
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry.rubric_id, index))
        .collect();
    let mut entries = existing;
    let mut log = TouchLog::default();
    let mut touched_order: Vec<usize> = Vec::new();

    for row in rows {
        for (rubric_id, marks) in row.contributions() {
            let index = *index_by_rubric
                .get(&rubric_id)
                .ok_or(ReconcileError::UnknownRubric {
                    rubric_id,
                    row: row.row,
                })?;
            let before = log.touch(rubric_id);
            if before == Touch::Unseen {
                touched_order.push(index);
            }
            let entry = &mut entries[index];
            entry.marks = apply_marks(entry.marks, marks, before, rubric_id, row.row)?;
        }
    }

    Ok(touched_order
        .into_iter()
        .map(|index| entries[index].clone())
        .collect())
}

/// Picks the create path when `existing` is empty and the update path
/// otherwise.
pub fn reconcile(
    existing: Vec<LedgerEntry>,
    rows: &[GradeSheetRow],
    attempt_id: AttemptId,
    revision_id: GradingRevisionId,
) -> Result<MarksPlan, ReconcileError> {
    if existing.is_empty() {
        Ok(MarksPlan {
            to_create: plan_new_entries(attempt_id, revision_id, rows)?,
            to_update: Vec::new(),
        })
    } else {
        Ok(MarksPlan {
            to_create: Vec::new(),
            to_update: plan_marks_update(existing, rows)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_marks_update, plan_new_entries, reconcile, ReconcileError};
    use crate::grading::sheet::{parse_rows, GradeSheetRow};
    use crate::model::ledger::LedgerEntry;

    const ATTEMPT: i64 = 11;
    const REVISION: i64 = 2;

    fn rows(raw: &[[&str; 4]]) -> Vec<GradeSheetRow> {
        parse_rows(raw.iter()).unwrap()
    }

    fn existing(id: i64, rubric_id: i64, marks: u16) -> LedgerEntry {
        LedgerEntry {
            id: Some(id),
            ..LedgerEntry::pending(ATTEMPT, rubric_id, REVISION, marks)
        }
    }

    fn marks_of(entries: &[LedgerEntry]) -> Vec<(i64, u16)> {
        entries.iter().map(|e| (e.rubric_id, e.marks)).collect()
    }

    #[test]
    fn create_path_builds_one_entry_per_named_rubric() {
        let plan = plan_new_entries(
            ATTEMPT,
            REVISION,
            &rows(&[["1", "", "", "10"], ["2", "", "", "5"]]),
        )
        .unwrap();

        assert_eq!(marks_of(&plan), vec![(1, 10), (2, 5)]);
        assert!(plan.iter().all(|e| e.id.is_none()
            && e.attempt_id == ATTEMPT
            && e.revision_id == REVISION));
    }

    #[test]
    fn repeated_rubric_sums_in_row_order() {
        // last-wins would give 1, first-wins 4, sum gives 4 + 2 + 1.
        let plan = plan_new_entries(
            ATTEMPT,
            REVISION,
            &rows(&[
                ["1", "2", "", "4"],
                ["1", "3", "", "2"],
                ["1", "", "", "1"],
            ]),
        )
        .unwrap();

        assert_eq!(marks_of(&plan), vec![(1, 7), (2, 4), (3, 2)]);
    }

    #[test]
    fn skipped_rows_contribute_nothing() {
        let plan = plan_new_entries(
            ATTEMPT,
            REVISION,
            &rows(&[["1", "2", "3", ""], ["4", "", "", "6"]]),
        )
        .unwrap();
        assert_eq!(marks_of(&plan), vec![(4, 6)]);
    }

    #[test]
    fn empty_level_two_never_reaches_level_three() {
        let plan = plan_new_entries(ATTEMPT, REVISION, &rows(&[["1", "", "5", "10"]])).unwrap();
        assert_eq!(marks_of(&plan), vec![(1, 10)]);
    }

    #[test]
    fn update_path_resets_stale_marks_on_first_touch() {
        let updated =
            plan_marks_update(vec![existing(40, 1, 7)], &rows(&[["1", "", "", "3"]])).unwrap();
        assert_eq!(marks_of(&updated), vec![(1, 3)]);
        assert_eq!(updated[0].id, Some(40));
    }

    #[test]
    fn update_path_accumulates_after_reset() {
        // stale 9 must not leak into the sum: 2 + 5, not 9 + 2 + 5.
        let updated = plan_marks_update(
            vec![existing(1, 1, 9), existing(2, 2, 9)],
            &rows(&[["1", "", "", "2"], ["1", "2", "", "5"]]),
        )
        .unwrap();
        assert_eq!(marks_of(&updated), vec![(1, 7), (2, 5)]);
    }

    #[test]
    fn update_path_leaves_untouched_entries_out() {
        let updated = plan_marks_update(
            vec![existing(1, 1, 9), existing(2, 2, 9)],
            &rows(&[["2", "", "", "1"], ["3", "", "", ""]]),
        )
        .unwrap();
        assert_eq!(marks_of(&updated), vec![(2, 1)]);
    }

    #[test]
    fn update_path_rejects_unknown_rubric() {
        let err = plan_marks_update(
            vec![existing(1, 1, 9)],
            &rows(&[["1", "", "", "2"], ["1", "8", "", "1"]]),
        )
        .unwrap_err();
        assert_eq!(err, ReconcileError::UnknownRubric { rubric_id: 8, row: 2 });
    }

    #[test]
    fn accumulation_overflow_is_an_error() {
        let err = plan_new_entries(
            ATTEMPT,
            REVISION,
            &rows(&[["1", "", "", "65535"], ["1", "", "", "1"]]),
        )
        .unwrap_err();
        assert_eq!(err, ReconcileError::MarksOverflow { rubric_id: 1, row: 2 });
    }

    #[test]
    fn reconcile_dispatches_on_existing_entries() {
        let sheet = rows(&[["1", "", "", "3"]]);

        let fresh = reconcile(Vec::new(), &sheet, ATTEMPT, REVISION).unwrap();
        assert_eq!(marks_of(&fresh.to_create), vec![(1, 3)]);
        assert!(fresh.to_update.is_empty());

        let again = reconcile(vec![existing(5, 1, 7)], &sheet, ATTEMPT, REVISION).unwrap();
        assert!(again.to_create.is_empty());
        assert_eq!(marks_of(&again.to_update), vec![(1, 3)]);
    }

    #[test]
    fn all_skipped_rows_yield_empty_plan() {
        let plan = reconcile(Vec::new(), &rows(&[["1", "", "", ""]]), ATTEMPT, REVISION).unwrap();
        assert!(plan.is_empty());
    }
}
