//! Student performance read path.
//!
//! # Responsibility
//! - Turn raw query parameters into typed ids.
//! - Return the rubric graph for one (student, question, revision).
//!
//! # Invariants
//! - Missing or non-numeric `question`/`revision` is a client error.
//! - No partial result is ever returned.

use crate::model::catalog::{GradingRevisionId, QuestionId, StudentId};
use crate::repo::ledger_repo::SqliteLedgerRepository;
use crate::repo::rubric_repo::SqliteRubricRepository;
use crate::repo::RepoError;
use crate::service::graph_service::{RubricGraph, RubricGraphService};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MISSING_IDS_MESSAGE: &str = "IDs of question and revision are required";

/// Read-path error split by who is at fault.
#[derive(Debug)]
pub enum ApiError {
    /// Caller sent missing or malformed parameters.
    BadRequest(&'static str),
    /// Store failure.
    Internal(RepoError),
}

impl ApiError {
    /// Returns whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "{message}"),
            Self::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BadRequest(_) => None,
            Self::Internal(err) => Some(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Internal(value)
    }
}

/// Parsed `?question=..&revision=..` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceQuery {
    pub question_id: QuestionId,
    pub revision_id: GradingRevisionId,
}

impl PerformanceQuery {
    /// Reads `question` and `revision` from key/value pairs. The first
    /// occurrence of each key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut question: Option<String> = None;
        let mut revision: Option<String> = None;
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "question" => &mut question,
                "revision" => &mut revision,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.as_ref().to_string());
            }
        }

        Ok(Self {
            question_id: parse_id(question.as_deref())?,
            revision_id: parse_id(revision.as_deref())?,
        })
    }

    /// Parses a raw, still URL-encoded query string such as
    /// `question=3&revision=1`. Percent escapes and `+` are decoded before
    /// the ids are read.
    pub fn from_query_string(query: &str) -> Result<Self, ApiError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
    }
}

fn parse_id(value: Option<&str>) -> Result<i64, ApiError> {
    value
        .and_then(|text| text.trim().parse::<i64>().ok())
        .ok_or(ApiError::BadRequest(MISSING_IDS_MESSAGE))
}

/// Returns the rubric graph a student earned on a question in one revision.
pub fn student_performance(
    conn: &Connection,
    student_id: StudentId,
    query: PerformanceQuery,
) -> Result<RubricGraph, ApiError> {
    let service = RubricGraphService::new(
        SqliteLedgerRepository::try_new(conn)?,
        SqliteRubricRepository::try_new(conn)?,
    );
    Ok(service.serialize(student_id, query.question_id, query.revision_id)?)
}

/// JSON form of [`student_performance`]: `{"rubrics": [...], "edges": [...]}`.
pub fn student_performance_json(
    conn: &Connection,
    student_id: StudentId,
    query_string: &str,
) -> Result<serde_json::Value, ApiError> {
    let query = PerformanceQuery::from_query_string(query_string)?;
    let graph = student_performance(conn, student_id, query)?;
    serde_json::to_value(graph)
        .map_err(|err| ApiError::Internal(RepoError::InvalidData(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::{ApiError, PerformanceQuery};

    #[test]
    fn query_string_parses_both_ids() {
        let query = PerformanceQuery::from_query_string("?question=12&revision=3").unwrap();
        assert_eq!(query.question_id, 12);
        assert_eq!(query.revision_id, 3);
    }

    #[test]
    fn first_occurrence_wins_and_unknown_keys_are_ignored() {
        let query = PerformanceQuery::from_pairs([
            ("x", "1"),
            ("revision", "2"),
            ("question", "4"),
            ("revision", "9"),
        ])
        .unwrap();
        assert_eq!(query.question_id, 4);
        assert_eq!(query.revision_id, 2);
    }

    #[test]
    fn encoded_values_are_decoded_before_parsing() {
        let query = PerformanceQuery::from_query_string("question=%31%32&revision=+3").unwrap();
        assert_eq!(query.question_id, 12);
        assert_eq!(query.revision_id, 3);

        let query = PerformanceQuery::from_query_string("revision=2&%71uestion=%37").unwrap();
        assert_eq!(query.question_id, 7);
    }

    #[test]
    fn missing_parameter_is_a_client_error() {
        let err = PerformanceQuery::from_query_string("question=1").unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn non_numeric_parameter_is_a_client_error() {
        let err = PerformanceQuery::from_query_string("question=one&revision=2").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "IDs of question and revision are required");
    }
}
