use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Cell;

/// One row of a source file after type coercion, in schema column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingRow {
    /// 1-based line number in the source file, for violation reporting.
    pub line: u64,
    /// Column values in schema column order.
    pub cells: Vec<Cell>,
}

impl StagingRow {
    pub fn new(line: u64, cells: Vec<Cell>) -> Self {
        Self { line, cells }
    }
}

/// The natural grain of a table: an ordered tuple of cell values that must be jointly
/// unique within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessKey(pub Vec<Cell>);

impl BusinessKey {
    /// Extracts the key cells at `indexes` from a row.
    pub fn from_row(row: &StagingRow, indexes: &[usize]) -> Self {
        Self::from_cells(&row.cells, indexes)
    }

    /// Extracts the key cells at `indexes` from a bare cell slice.
    pub fn from_cells(cells: &[Cell], indexes: &[usize]) -> Self {
        BusinessKey(indexes.iter().map(|&i| cells[i].clone()).collect())
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, cell) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{cell}")?;
        }
        f.write_str(")")
    }
}
