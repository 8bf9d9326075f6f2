//! Domain model for rubric graphs, grading catalog records and the marks
//! ledger.
//!
//! # Responsibility
//! - Define the records shared by repositories, the reconciler and the
//!   graph serializer.
//!
//! # Invariants
//! - Identifiers are SQLite row ids and never reused.
//! - At most one ledger entry exists per (attempt, rubric, revision).

pub mod catalog;
pub mod ledger;
pub mod rubric;
