//! FILENAME: crosstab-engine/src/settings.rs
//! Pivot Settings - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot. These
//! structures are designed to be:
//! - Serializable (persisted with the question/dashboard and round-tripped)
//! - Opaque to the host: it stores them, we interpret them
//! - Immutable snapshots of user intent; the engine proposes updates
//!   (sort toggles, collapse toggles) that the host applies and re-submits

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use resultset::Value;

// ============================================================================
// COLUMN REFERENCES
// ============================================================================

/// A reference to a result column by its stable name.
///
/// References that match no column in the current result are stale (the
/// query changed underneath the saved settings) and are dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef(pub String);

impl ColumnRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef(name.to_string())
    }
}

/// Which result columns span the row axis, the column axis, and the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSplit {
    /// Columns nested down the left edge (outer to inner).
    #[serde(default)]
    pub rows: Vec<ColumnRef>,

    /// Columns nested across the top (outer to inner).
    #[serde(default)]
    pub columns: Vec<ColumnRef>,

    /// Measure columns filling the body cells.
    #[serde(default)]
    pub values: Vec<ColumnRef>,
}

// ============================================================================
// SORTING
// ============================================================================

/// Sort direction for a header level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// What the values being compared are taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SortTarget {
    /// Compare sibling header keys directly.
    Key,

    /// Compare pre-aggregated measure values: each sibling's path is probed
    /// in the subtotal index together with a fixed column path.
    Measure {
        /// Ordinal of the measure among the value columns.
        value_index: usize,

        /// Column path of the probed cells. Empty means the row-totals
        /// column.
        #[serde(default)]
        column_path: Vec<Value>,
    },
}

impl Default for SortTarget {
    fn default() -> Self {
        SortTarget::Key
    }
}

/// One sort rule, applied to the direct children of one tree level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRule {
    #[serde(default)]
    pub target: SortTarget,

    #[serde(default)]
    pub direction: SortDirection,
}

// ============================================================================
// PER-COLUMN SETTINGS
// ============================================================================

/// Display settings resolved per column.
///
/// The engine reads these through `RenderHooks::settings_for`, so a host can
/// merge in settings from scopes this crate never sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSettings {
    /// Keeps this column's header level sorted on every insertion.
    #[serde(default)]
    pub sort_order: Option<SortDirection>,

    /// Whether subtotal rows appear for groups of this column.
    /// Unset counts as enabled.
    #[serde(default)]
    pub show_totals: Option<bool>,

    /// Override for the column's display name.
    #[serde(default)]
    pub title: Option<String>,
}

impl ColumnSettings {
    pub fn shows_totals(&self) -> bool {
        self.show_totals != Some(false)
    }
}

// ============================================================================
// PERSISTED LAYOUT STATE
// ============================================================================

/// Column widths persisted by the renderer. The engine stores and returns
/// them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnWidths {
    #[serde(default)]
    pub left_header_widths: Vec<f64>,

    #[serde(default)]
    pub value_header_widths: Vec<f64>,

    #[serde(default)]
    pub total_left_header_width: Option<f64>,
}

// ============================================================================
// MAIN SETTINGS STRUCT
// ============================================================================

/// The complete, serializable pivot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSettings {
    /// How result columns are distributed over the two axes and the body.
    /// `None` means the question was never configured as a pivot: `pivot`
    /// returns `Ok(None)` and the caller falls back to a flat table.
    #[serde(default)]
    pub column_split: Option<ColumnSplit>,

    /// Collapsed row groups. Each entry is either a JSON-encoded value path
    /// (`["CA","Widget"]` collapses that subtree) or a JSON-encoded integer
    /// (`"2"` collapses every row group at that depth, counted 1-based).
    #[serde(default)]
    pub collapsed_subtotals: Vec<String>,

    /// Sort rules for row-tree levels, keyed by the JSON-encoded path of the
    /// level's parent (`"[]"` for the root level).
    #[serde(default)]
    pub row_sort_order: FxHashMap<String, SortRule>,

    /// Show the right-hand "Row totals" column.
    #[serde(default = "default_true")]
    pub show_row_totals: bool,

    /// Show subtotal rows and the bottom "Grand totals" row.
    #[serde(default = "default_true")]
    pub show_column_totals: bool,

    /// Attach measure headers to the row axis instead of the column axis.
    #[serde(default)]
    pub measures_as_rows: bool,

    /// Place totals rows above their group instead of below it.
    #[serde(default)]
    pub row_totals_on_top: bool,

    /// Per-column display settings, keyed by column name.
    #[serde(default)]
    pub per_column: FxHashMap<String, ColumnSettings>,

    /// Renderer layout state, persisted round-trip.
    #[serde(default)]
    pub column_widths: ColumnWidths,
}

fn default_true() -> bool {
    true
}

impl Default for PivotSettings {
    fn default() -> Self {
        PivotSettings {
            column_split: None,
            collapsed_subtotals: Vec::new(),
            row_sort_order: FxHashMap::default(),
            show_row_totals: true,
            show_column_totals: true,
            measures_as_rows: false,
            row_totals_on_top: false,
            per_column: FxHashMap::default(),
            column_widths: ColumnWidths::default(),
        }
    }
}

impl PivotSettings {
    /// Creates settings with the given split and everything else default.
    pub fn with_split(split: ColumnSplit) -> Self {
        PivotSettings {
            column_split: Some(split),
            ..PivotSettings::default()
        }
    }

    /// Collapses the row group at `path`, or expands it if already collapsed.
    pub fn toggle_collapsed(&mut self, path: &[Value]) {
        let key = encode_path(path);
        if let Some(pos) = self.collapsed_subtotals.iter().position(|p| *p == key) {
            self.collapsed_subtotals.remove(pos);
        } else {
            self.collapsed_subtotals.push(key);
        }
    }

    /// Applies a proposed sort rule at `path_key`. Applying the identical
    /// rule again clears it, so repeated clicks cycle through
    /// descending / ascending / off.
    pub fn apply_sort(&mut self, path_key: &str, rule: SortRule) {
        match self.row_sort_order.get(path_key) {
            Some(existing) if *existing == rule => {
                self.row_sort_order.remove(path_key);
            }
            _ => {
                self.row_sort_order.insert(path_key.to_string(), rule);
            }
        }
    }

    pub fn clear_sort(&mut self, path_key: &str) {
        self.row_sort_order.remove(path_key);
    }
}

/// Encodes a value path the way `collapsed_subtotals` entries and
/// `row_sort_order` keys store it.
pub fn encode_path(path: &[Value]) -> String {
    serde_json::to_string(path).unwrap_or_default()
}
