//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate parsing, reconciliation and repository calls into
//!   use-case level APIs.
//! - Keep the CLI and read-path adapter decoupled from storage details.

pub mod grade_sheet_service;
pub mod graph_service;
pub mod seed_service;
