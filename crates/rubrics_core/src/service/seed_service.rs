//! Demo data seeding.
//!
//! Builds one small rubric tree, a question, a student and an attempt so the
//! import and read paths can be exercised against a fresh database:
//!
//! ```text
//!     A
//!     |
//!     B
//!    / \
//!   C   D
//! ```
//!
//! # Invariants
//! - Seeding is one transaction; a failure leaves the store unchanged.
//! - Revisions `initial` and `recheck` and the demo student are reused when
//!   they already exist.

use crate::model::catalog::{AttemptId, GradingRevision, QuestionId, StudentId};
use crate::model::rubric::{NewRubric, RubricId, RubricTreeId};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::rubric_repo::{RubricRepository, SqliteRubricRepository};
use crate::repo::RepoResult;
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub const SEED_REVISIONS: [&str; 2] = ["initial", "recheck"];
const SEED_STUDENT: &str = "demo_student";

/// Ids of the records written by [`seed_demo_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub tree_id: RubricTreeId,
    /// Rubrics `A`, `B`, `C`, `D` in that order.
    pub rubric_ids: [RubricId; 4],
    pub question_id: QuestionId,
    pub student_id: StudentId,
    pub attempt_id: AttemptId,
    pub revisions: Vec<GradingRevision>,
}

/// Seeds the demo rubric tree and grading catalog.
pub fn seed_demo_data(conn: &mut Connection) -> RepoResult<SeedSummary> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let summary = {
        let rubrics = SqliteRubricRepository::try_new(&tx)?;
        let catalog = SqliteCatalogRepository::try_new(&tx)?;

        let tree_id = rubrics.create_tree()?;
        let a = rubrics.create_rubric(
            &NewRubric::new(tree_id, "A").with_guidelines("Overall answer quality"),
        )?;
        let b = rubrics.create_rubric(
            &NewRubric::new(tree_id, "B").with_guidelines("Working shown"),
        )?;
        let c = rubrics.create_rubric(
            &NewRubric::new(tree_id, "C")
                .leaf()
                .with_guidelines("Correct method"),
        )?;
        let d = rubrics.create_rubric(
            &NewRubric::new(tree_id, "D")
                .leaf()
                .with_guidelines("Correct result"),
        )?;
        rubrics.create_edge(tree_id, a.id, b.id)?;
        rubrics.create_edge(tree_id, b.id, c.id)?;
        rubrics.create_edge(tree_id, b.id, d.id)?;

        let question = catalog.create_question("Demo question", tree_id)?;
        let student = match catalog.find_student_by_username(SEED_STUDENT)? {
            Some(student) => student,
            None => catalog.create_student(SEED_STUDENT)?,
        };
        let attempt = catalog.create_attempt(student.id, question.id, tree_id)?;

        let mut revisions = Vec::with_capacity(SEED_REVISIONS.len());
        for name in SEED_REVISIONS {
            let revision = match catalog.find_revision_by_name(name)? {
                Some(revision) => revision,
                None => catalog.create_revision(name)?,
            };
            revisions.push(revision);
        }

        SeedSummary {
            tree_id,
            rubric_ids: [a.id, b.id, c.id, d.id],
            question_id: question.id,
            student_id: student.id,
            attempt_id: attempt.id,
            revisions,
        }
    };
    tx.commit()?;

    info!(
        "event=seed_db module=service status=ok tree_id={} question_id={} student_id={} attempt_id={}",
        summary.tree_id, summary.question_id, summary.student_id, summary.attempt_id
    );
    Ok(summary)
}
