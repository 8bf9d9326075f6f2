//! Core domain logic for revisioned rubric grading.
//! This crate is the single source of truth for marks-ledger invariants.

pub mod api;
pub mod db;
pub mod grading;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{student_performance, student_performance_json, ApiError, PerformanceQuery};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use grading::reconcile::{reconcile, MarksPlan, ReconcileError};
pub use grading::sheet::{parse_rows, GradeSheetError, GradeSheetRow};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::catalog::{Attempt, GradingRevision, Question, Student};
pub use model::ledger::{LedgerEntry, RubricMarks};
pub use model::rubric::{NewRubric, Rubric, RubricEdge};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
pub use repo::rubric_repo::{RubricRepository, SqliteRubricRepository};
pub use repo::{RepoError, RepoResult};
pub use service::grade_sheet_service::{
    GradeSheetService, ImportError, ImportPath, ImportSummary,
};
pub use service::graph_service::{GraphEdge, RubricGraph, RubricGraphService, RubricNode};
pub use service::seed_service::{seed_demo_data, SeedSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
