//! Grade-sheet ingestion: row parsing and mark reconciliation.
//!
//! # Responsibility
//! - Turn raw grading-sheet cells into typed rows.
//! - Merge typed rows into per-(attempt, rubric, revision) ledger entries.
//!
//! # Invariants
//! - Nothing here touches storage; callers persist the resulting plan.

pub mod reconcile;
pub mod sheet;
