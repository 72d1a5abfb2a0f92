//! FILENAME: crosstab-engine/src/view.rs
//! Pivot View - Renderable output for the frontend.
//!
//! This module holds the data structures the frontend renders. It includes
//! metadata for:
//! - Row/column headers with spans and nesting depth
//! - Cell types (data, subtotal, grand total)
//! - Click payloads (drill-down and sort affordances)

use serde::{Deserialize, Serialize};

use resultset::Value;

use crate::settings::SortDirection;
use crate::settings::SortRule;

// ============================================================================
// CLICK PAYLOADS
// ============================================================================

/// One column/value pair of a clicked cell's coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the source column.
    pub column: String,

    /// The raw (unformatted) value.
    pub value: Value,
}

impl Dimension {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        Dimension {
            column: column.into(),
            value,
        }
    }
}

/// What the frontend should do when an item is clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClickDescriptor {
    /// A header value was clicked: drill into this group.
    Header {
        /// Name of the breakout column at this depth.
        column: String,
        /// The raw header value.
        value: Value,
        /// Full value path from the root down to this header.
        path: Vec<Value>,
    },

    /// A body cell was clicked: drill into the underlying record.
    Cell {
        /// Every column/value pair of the source row, in column order.
        data: Vec<Dimension>,
        /// The breakout pairs only, for building filters.
        dimensions: Vec<Dimension>,
    },

    /// A subtotal cell was clicked: toggle sorting by that measure.
    SortToggle {
        /// Settings key of the level to re-sort (JSON-encoded parent path).
        path_key: String,
        /// The rule to apply; applying an identical rule twice clears it.
        rule: SortRule,
    },
}

// ============================================================================
// HEADER ITEMS
// ============================================================================

/// One rendered entry of a header band (top or left).
///
/// Spans and offsets are in leaf units: a parent covering three leaf
/// columns has `span == 3` and its first leaf's `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderItem {
    /// Nesting depth, 0 = outermost.
    pub depth: usize,

    /// Leaf index where this item starts.
    pub offset: usize,

    /// Number of leaf positions covered.
    pub span: usize,

    /// Height of the subtree underneath, in levels. Leaves are 0.
    pub max_depth_below: usize,

    /// Value path from the root, where one exists. Grand totals and
    /// measure-name items carry no path.
    pub path: Option<Vec<Value>>,

    /// The raw group value, absent for totals and measure names.
    pub raw_value: Option<Value>,

    /// Formatted display text.
    pub label: String,

    /// Whether further levels render underneath this item.
    pub has_children: bool,

    /// Whether this item is a "Totals for X" entry.
    pub is_subtotal: bool,

    /// Whether this item is the grand total entry.
    pub is_grand_total: bool,

    /// Whether this item stands in for a collapsed subtree.
    pub is_collapsed: bool,

    /// Active sort direction, when a sort rule targets this item.
    pub sort_state: Option<SortDirection>,

    /// Click payload, when the item is interactive.
    pub clicked: Option<ClickDescriptor>,
}

// ============================================================================
// BODY CELLS
// ============================================================================

/// A single cell of the pivot body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyCell {
    /// The raw value.
    pub value: Value,

    /// Formatted display text.
    pub label: String,

    /// Background color from the render hooks, if any.
    pub background_color: Option<String>,

    /// Whether this cell sits on a subtotal row or column.
    pub is_subtotal: bool,

    /// Whether this cell sits on the grand total row.
    pub is_grand_total: bool,

    /// Click payload, when the cell is interactive.
    pub clicked: Option<ClickDescriptor>,
}

impl BodyCell {
    /// Creates a plain data cell.
    pub fn data(value: Value, label: String) -> Self {
        BodyCell {
            value,
            label,
            background_color: None,
            is_subtotal: false,
            is_grand_total: false,
            clicked: None,
        }
    }

    /// Sets the background color.
    pub fn with_background(mut self, color: Option<String>) -> Self {
        self.background_color = color;
        self
    }

    /// Attaches a click payload.
    pub fn with_click(mut self, clicked: ClickDescriptor) -> Self {
        self.clicked = Some(clicked);
        self
    }

    /// Marks the cell as part of a subtotal section.
    pub fn as_subtotal(mut self) -> Self {
        self.is_subtotal = true;
        self
    }

    /// Marks the cell as part of the grand total section.
    pub fn as_grand_total(mut self) -> Self {
        self.is_subtotal = true;
        self.is_grand_total = true;
        self
    }
}
