//! Grading catalog records: revisions, students, questions and attempts.
//!
//! # Invariants
//! - Revision names are unique, non-blank and at most
//!   `REVISION_NAME_MAX_CHARS` characters.
//! - An attempt keeps the rubric tree it was created with, even if its
//!   question later moves to another tree.

use crate::model::rubric::RubricTreeId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GradingRevisionId = i64;
pub type StudentId = i64;
pub type QuestionId = i64;
pub type AttemptId = i64;

pub const REVISION_NAME_MAX_CHARS: usize = 32;

/// A named grading pass such as `initial` or `recheck`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingRevision {
    pub id: GradingRevisionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub q_text: String,
    /// Current rubric tree template for new attempts.
    pub rubric_tree_id: RubricTreeId,
}

/// One student's attempt at one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub student_id: StudentId,
    pub question_id: QuestionId,
    /// Tree snapshot this attempt is graded against.
    pub rubric_tree_id: RubricTreeId,
}

/// Validation failures for catalog input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    BlankRevisionName,
    RevisionNameTooLong { chars: usize },
    BlankUsername,
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankRevisionName => write!(f, "revision name must not be blank"),
            Self::RevisionNameTooLong { chars } => write!(
                f,
                "revision name has {chars} characters; at most {REVISION_NAME_MAX_CHARS} allowed"
            ),
            Self::BlankUsername => write!(f, "student username must not be blank"),
        }
    }
}

impl Error for CatalogValidationError {}

/// Trims and checks a revision name.
pub fn normalize_revision_name(name: &str) -> Result<String, CatalogValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogValidationError::BlankRevisionName);
    }
    let chars = trimmed.chars().count();
    if chars > REVISION_NAME_MAX_CHARS {
        return Err(CatalogValidationError::RevisionNameTooLong { chars });
    }
    Ok(trimmed.to_string())
}

/// Trims and checks a student username.
pub fn normalize_username(username: &str) -> Result<String, CatalogValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(CatalogValidationError::BlankUsername);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_revision_name, normalize_username, CatalogValidationError};

    #[test]
    fn revision_name_is_trimmed() {
        assert_eq!(normalize_revision_name("  recheck ").unwrap(), "recheck");
    }

    #[test]
    fn revision_name_rejects_blank_and_oversized_values() {
        assert_eq!(
            normalize_revision_name("   ").unwrap_err(),
            CatalogValidationError::BlankRevisionName
        );
        let long = "r".repeat(33);
        assert_eq!(
            normalize_revision_name(&long).unwrap_err(),
            CatalogValidationError::RevisionNameTooLong { chars: 33 }
        );
    }

    #[test]
    fn username_rejects_blank() {
        assert_eq!(
            normalize_username("").unwrap_err(),
            CatalogValidationError::BlankUsername
        );
    }
}
