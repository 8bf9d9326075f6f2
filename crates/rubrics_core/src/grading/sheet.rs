//! Grading-sheet row model.
//!
//! A data row is `rubric_l1, rubric_l2, rubric_l3, marks`. Levels are read
//! left to right and scanning stops at the first empty level, so a row with
//! levels 1 and 3 but no level 2 only names level 1. An empty marks cell
//! disables the whole row.

use crate::model::rubric::RubricId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of rubric hierarchy columns at the start of each row.
pub const RUBRIC_LEVELS: usize = 3;
/// Zero-based column holding the marks value.
pub const MARKS_COLUMN_INDEX: usize = 3;

/// Errors raised while parsing grading-sheet rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeSheetError {
    /// A named hierarchy level is not an integer rubric id.
    InvalidRubricId {
        row: usize,
        level: usize,
        value: String,
    },
    /// Marks cell is set but not a non-negative small integer.
    InvalidMarks { row: usize, value: String },
}

impl Display for GradeSheetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRubricId { row, level, value } => write!(
                f,
                "row {row}: level {level} rubric id `{value}` is not an integer"
            ),
            Self::InvalidMarks { row, value } => {
                write!(f, "row {row}: marks `{value}` is not a valid integer")
            }
        }
    }
}

impl Error for GradeSheetError {}

/// One parsed grading decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeSheetRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Named rubric ids from level 1 downward, up to the first empty level.
    /// Empty when the row is skipped.
    pub rubric_path: Vec<RubricId>,
    /// `None` when the marks cell is empty.
    pub marks: Option<u16>,
}

impl GradeSheetRow {
    /// Parses the cells of one data row.
    ///
    /// Missing trailing cells count as empty; cells past the marks column
    /// are ignored.
    pub fn parse<S: AsRef<str>>(row: usize, cells: &[S]) -> Result<Self, GradeSheetError> {
        let cell = |index: usize| cells.get(index).map_or("", |value| value.as_ref().trim());

        let marks_text = cell(MARKS_COLUMN_INDEX);
        if marks_text.is_empty() {
            return Ok(Self {
                row,
                rubric_path: Vec::new(),
                marks: None,
            });
        }
        let marks = marks_text
            .parse::<u16>()
            .map_err(|_| GradeSheetError::InvalidMarks {
                row,
                value: marks_text.to_string(),
            })?;

        let mut rubric_path = Vec::with_capacity(RUBRIC_LEVELS);
        for level in 0..RUBRIC_LEVELS {
            let text = cell(level);
            if text.is_empty() {
                break;
            }
            let rubric_id =
                text.parse::<RubricId>()
                    .map_err(|_| GradeSheetError::InvalidRubricId {
                        row,
                        level: level + 1,
                        value: text.to_string(),
                    })?;
            rubric_path.push(rubric_id);
        }

        Ok(Self {
            row,
            rubric_path,
            marks: Some(marks),
        })
    }

    /// Yields `(rubric_id, marks)` for every rubric this row contributes to.
    pub fn contributions(&self) -> impl Iterator<Item = (RubricId, u16)> + '_ {
        self.marks
            .into_iter()
            .flat_map(move |marks| self.rubric_path.iter().map(move |id| (*id, marks)))
    }

    /// Returns whether the row contributes marks to at least one rubric.
    pub fn is_active(&self) -> bool {
        self.marks.is_some() && !self.rubric_path.is_empty()
    }
}

/// Parses every data row, failing on the first malformed one.
///
/// Rows are numbered from 1 in iteration order; the header must already be
/// dropped.
pub fn parse_rows<I, R, S>(rows: I) -> Result<Vec<GradeSheetRow>, GradeSheetError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, cells)| GradeSheetRow::parse(index + 1, cells.as_ref()))
        .collect()
}
