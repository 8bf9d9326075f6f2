//! Rubric graph model.
//!
//! # Responsibility
//! - Describe rubric nodes and the parent -> child edges that connect them
//!   inside one rubric tree.
//!
//! # Invariants
//! - A rubric and every edge touching it belong to the same tree.
//! - Tree shape (single parent, acyclic) is not enforced.

use serde::{Deserialize, Serialize};

/// Row id of a `rubric_trees` record.
pub type RubricTreeId = i64;
/// Row id of a `rubrics` record.
pub type RubricId = i64;
/// Row id of a `rubric_edges` record.
pub type RubricEdgeId = i64;

/// Max marks assigned to a rubric when the author does not pick one.
pub const RUBRIC_DEFAULT_MAX_MARKS: u16 = 10;

/// One grading criterion. Leaf rubrics are graded directly; the rest group
/// their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: RubricId,
    pub tree_id: RubricTreeId,
    pub name: String,
    pub max_marks: u16,
    pub grading_guidelines: String,
    pub is_leaf: bool,
}

/// Input for creating a rubric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRubric {
    pub tree_id: RubricTreeId,
    pub name: String,
    pub max_marks: u16,
    pub grading_guidelines: String,
    pub is_leaf: bool,
}

impl NewRubric {
    /// Starts a non-leaf rubric with default max marks and no guidelines.
    pub fn new(tree_id: RubricTreeId, name: impl Into<String>) -> Self {
        Self {
            tree_id,
            name: name.into(),
            max_marks: RUBRIC_DEFAULT_MAX_MARKS,
            grading_guidelines: String::new(),
            is_leaf: false,
        }
    }

    /// Marks the rubric as a leaf.
    pub fn leaf(mut self) -> Self {
        self.is_leaf = true;
        self
    }

    pub fn with_max_marks(mut self, max_marks: u16) -> Self {
        self.max_marks = max_marks;
        self
    }

    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.grading_guidelines = guidelines.into();
        self
    }
}

/// Directed parent -> child connector between two rubrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricEdge {
    pub id: RubricEdgeId,
    pub tree_id: RubricTreeId,
    pub src_rubric_id: RubricId,
    pub dest_rubric_id: RubricId,
}
