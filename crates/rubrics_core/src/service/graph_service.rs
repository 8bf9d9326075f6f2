//! Rubric graph serialization for one (student, question, revision).
//!
//! # Responsibility
//! - Collect the ledger entries a student earned on a question in one
//!   revision, and the rubric edges around them.
//!
//! # Invariants
//! - Nodes are ledger entries, one per entry.
//! - Edges are every edge whose source or destination is a touched rubric,
//!   so an edge may name a rubric that has no node.
//! - No entries yields empty lists, not an error.

use crate::model::catalog::{GradingRevisionId, QuestionId, StudentId};
use crate::model::ledger::{LedgerEntryId, RubricMarks};
use crate::model::rubric::{RubricEdge, RubricId};
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::rubric_repo::RubricRepository;
use crate::repo::RepoResult;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One rendered rubric node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricNode {
    /// Ledger entry id.
    pub id: LedgerEntryId,
    pub rubric_id: RubricId,
    pub name: String,
    pub marks: u16,
    pub max_marks: u16,
}

impl From<RubricMarks> for RubricNode {
    fn from(value: RubricMarks) -> Self {
        Self {
            id: value.entry_id,
            rubric_id: value.rubric_id,
            name: value.rubric_name,
            marks: value.marks,
            max_marks: value.max_marks,
        }
    }
}

/// One rendered parent -> child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: RubricId,
    pub destination: RubricId,
}

impl From<RubricEdge> for GraphEdge {
    fn from(value: RubricEdge) -> Self {
        Self {
            source: value.src_rubric_id,
            destination: value.dest_rubric_id,
        }
    }
}

/// Serialized form: `{"rubrics": [...], "edges": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricGraph {
    pub rubrics: Vec<RubricNode>,
    pub edges: Vec<GraphEdge>,
}

/// Graph serializer over the ledger and rubric graph stores.
pub struct RubricGraphService<L: LedgerRepository, R: RubricRepository> {
    ledger: L,
    rubrics: R,
}

impl<L: LedgerRepository, R: RubricRepository> RubricGraphService<L, R> {
    pub fn new(ledger: L, rubrics: R) -> Self {
        Self { ledger, rubrics }
    }

    /// Builds the rubric graph a student earned on a question in one
    /// revision.
    pub fn serialize(
        &self,
        student_id: StudentId,
        question_id: QuestionId,
        revision_id: GradingRevisionId,
    ) -> RepoResult<RubricGraph> {
        let marks = self
            .ledger
            .list_rubric_marks(student_id, question_id, revision_id)?;
        let touched: Vec<RubricId> = marks
            .iter()
            .map(|item| item.rubric_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let edges = self.rubrics.list_edges_touching(&touched)?;

        info!(
            "event=rubric_graph_serialize module=service status=ok student_id={student_id} question_id={question_id} revision_id={revision_id} nodes={} edges={}",
            marks.len(),
            edges.len()
        );

        Ok(RubricGraph {
            rubrics: marks.into_iter().map(RubricNode::from).collect(),
            edges: edges.into_iter().map(GraphEdge::from).collect(),
        })
    }
}
