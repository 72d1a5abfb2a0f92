//! FILENAME: resultset/src/table.rs
//! The flat result-set container handed to the pivot engine.

use serde::{Deserialize, Serialize};

use crate::column::{ColumnIndex, ColumnSpec};
use crate::value::Value;

/// A flat query result: column metadata plus row-major cells.
///
/// Row length always matches `cols.len()`; the producer guarantees it and
/// the engine indexes on that assumption.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub cols: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(cols: Vec<ColumnSpec>, rows: Vec<Vec<Value>>) -> Self {
        ResultSet { cols, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.cols.len()
    }

    /// Position of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<ColumnIndex> {
        self.cols.iter().position(|c| c.name == name)
    }

    /// Position of the hidden grouping column, if present.
    pub fn grouping_index(&self) -> Option<ColumnIndex> {
        self.cols.iter().position(|c| c.is_grouping())
    }
}
