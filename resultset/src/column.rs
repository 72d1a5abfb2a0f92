//! FILENAME: resultset/src/column.rs
//! Column metadata for a query result.

use serde::{Deserialize, Serialize};

/// Index into the result columns (0-based).
pub type ColumnIndex = usize;

/// Well-known name of the hidden grouping column.
///
/// Pivot queries run the same aggregation at every grain and union the rows
/// together; this extra integer column records, as a bitmask, which breakout
/// columns were grouped away in each row. The column never reaches the user.
pub const GROUPING_COLUMN: &str = "pivot-grouping";

// ============================================================================
// COLUMN SPEC
// ============================================================================

/// Where a result column came from in the originating query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    /// A grouping dimension (GROUP BY column).
    Breakout,
    /// An aggregated measure (SUM, COUNT, ...).
    Aggregation,
    /// Anything else (expressions, plain fields).
    Other,
}

impl Default for ColumnRole {
    fn default() -> Self {
        ColumnRole::Other
    }
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Stable column name, unique within the result.
    pub name: String,

    /// User-facing name.
    pub display_name: String,

    /// Role in the originating query.
    #[serde(default)]
    pub role: ColumnRole,

    /// Optional semantic hint (e.g. "type/State", "type/Currency") passed
    /// through to formatting hooks untouched.
    #[serde(default)]
    pub semantic_type: Option<String>,

    /// Optional unit hint ("USD", "ms"), also passthrough.
    #[serde(default)]
    pub unit: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, role: ColumnRole) -> Self {
        let name = name.into();
        ColumnSpec {
            display_name: name.clone(),
            name,
            role,
            semantic_type: None,
            unit: None,
        }
    }

    pub fn breakout(name: impl Into<String>) -> Self {
        ColumnSpec::new(name, ColumnRole::Breakout)
    }

    pub fn aggregation(name: impl Into<String>) -> Self {
        ColumnSpec::new(name, ColumnRole::Aggregation)
    }

    /// The hidden grouping column is recognized by name, not by role.
    pub fn is_grouping(&self) -> bool {
        self.name == GROUPING_COLUMN
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}
