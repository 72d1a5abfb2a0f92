//! FILENAME: crosstab-engine/src/section.rs
//! Row Section Resolver - Lazy, memoized body cell production.
//!
//! A section is the group of body cells (one per value column) at one
//! (column path, row path) intersection. Full-length paths resolve through
//! the primary leaf map; short paths resolve through the subtotal index.
//! Sections are built on demand and memoized per index pair for the
//! lifetime of one pivot output.

use rustc_hash::FxHashMap;

use resultset::{ColumnSpec, Value};

use crate::engine::RenderHooks;
use crate::header::MemoFormatter;
use crate::settings::{encode_path, SortDirection, SortRule, SortTarget};
use crate::subtotal::SubtotalIndex;
use crate::tree::CollapsedSet;
use crate::view::{BodyCell, ClickDescriptor, Dimension};

// ============================================================================
// LEAF ENTRIES
// ============================================================================

/// One primary-slice row, filed under its column-path ++ row-path values.
#[derive(Debug, Clone)]
pub(crate) struct LeafEntry {
    /// Measure values, in value-column order.
    pub values: Vec<Value>,

    /// Every column/value pair of the source row, in column order.
    pub data: Vec<Dimension>,

    /// The breakout pairs only, for building filters.
    pub dimensions: Vec<Dimension>,

    /// Ordinal of the row within the primary slice, for the color hook.
    pub source_row: usize,
}

// ============================================================================
// SECTION RESOLVER
// ============================================================================

/// Resolves body sections against the leaf map and the subtotal index.
pub(crate) struct SectionResolver<'a> {
    pub(crate) hooks: &'a dyn RenderHooks,
    pub(crate) leaf_values: FxHashMap<Vec<Value>, LeafEntry>,
    pub(crate) subtotals: SubtotalIndex,
    pub(crate) value_formatters: Vec<MemoFormatter<'a>>,
    pub(crate) value_columns: Vec<ColumnSpec>,
    pub(crate) row_positions: Vec<usize>,
    pub(crate) column_positions: Vec<usize>,
    pub(crate) collapsed: CollapsedSet,
    pub(crate) sort_rules: FxHashMap<Vec<Value>, SortRule>,
    pub(crate) cache: FxHashMap<(usize, usize), Vec<BodyCell>>,
}

impl<'a> SectionResolver<'a> {
    /// Returns the section at one header intersection, building it on first
    /// access.
    pub(crate) fn section(
        &mut self,
        col_idx: usize,
        row_idx: usize,
        column_paths: &[Vec<Value>],
        row_paths: &[Vec<Value>],
    ) -> &[BodyCell] {
        let key = (col_idx, row_idx);
        if !self.cache.contains_key(&key) {
            let cells = self.build_section(col_idx, row_idx, column_paths, row_paths);
            self.cache.insert(key, cells);
        }
        self.cache.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn build_section(
        &mut self,
        col_idx: usize,
        row_idx: usize,
        column_paths: &[Vec<Value>],
        row_paths: &[Vec<Value>],
    ) -> Vec<BodyCell> {
        // Out-of-range indexes behave as empty paths.
        let col_path = column_paths.get(col_idx).map(Vec::as_slice).unwrap_or(&[]);
        let row_path = row_paths.get(row_idx).map(Vec::as_slice).unwrap_or(&[]);

        let full_length = col_path.len() == self.column_positions.len()
            && row_path.len() == self.row_positions.len();
        if full_length {
            self.leaf_section(col_path, row_path)
        } else {
            self.total_section(col_path, row_path)
        }
    }

    /// Exact lookup of one primary-slice row.
    fn leaf_section(&mut self, col_path: &[Value], row_path: &[Value]) -> Vec<BodyCell> {
        let mut key = Vec::with_capacity(col_path.len() + row_path.len());
        key.extend_from_slice(col_path);
        key.extend_from_slice(row_path);

        let entry = match self.leaf_values.get(&key) {
            Some(entry) => entry.clone(),
            None => return self.blank_section(),
        };
        let clicked = ClickDescriptor::Cell {
            data: entry.data,
            dimensions: entry.dimensions,
        };

        let mut cells = Vec::with_capacity(self.value_columns.len());
        for (ordinal, value) in entry.values.iter().enumerate() {
            let label = self.value_formatters[ordinal].format(value);
            let color =
                self.hooks
                    .color_for(value, entry.source_row, &self.value_columns[ordinal].name);
            cells.push(
                BodyCell::data(value.clone(), label)
                    .with_background(color)
                    .with_click(clicked.clone()),
            );
        }
        cells
    }

    /// A leaf combination with no backing row renders one Null cell per
    /// measure.
    fn blank_section(&mut self) -> Vec<BodyCell> {
        (0..self.value_columns.len())
            .map(|ordinal| {
                let label = self.value_formatters[ordinal].format(&Value::Null);
                BodyCell::data(Value::Null, label)
            })
            .collect()
    }

    /// Probe of the subtotal index with however much of each path is pinned.
    fn total_section(&mut self, col_path: &[Value], row_path: &[Value]) -> Vec<BodyCell> {
        let mut pairs = Vec::with_capacity(col_path.len() + row_path.len());
        for (i, value) in col_path.iter().enumerate() {
            pairs.push((self.column_positions[i], value.clone()));
        }
        for (i, value) in row_path.iter().enumerate() {
            pairs.push((self.row_positions[i], value.clone()));
        }
        let values = match self.subtotals.lookup(pairs) {
            Some(values) => values.to_vec(),
            None => vec![Value::Null; self.value_columns.len()],
        };

        let is_grand_total = row_path.is_empty();
        let sortable = !row_path.is_empty() && !self.collapsed.covers(row_path);

        let mut cells = Vec::with_capacity(values.len());
        for (ordinal, value) in values.into_iter().enumerate() {
            let label = self.value_formatters[ordinal].format(&value);
            let mut cell = BodyCell::data(value, label);
            cell = if is_grand_total {
                cell.as_grand_total()
            } else {
                cell.as_subtotal()
            };
            if sortable {
                cell = cell.with_click(self.sort_toggle(col_path, row_path, ordinal));
            }
            cells.push(cell);
        }
        cells
    }

    /// Proposes the next sort rule for a subtotal cell: like-for-like clicks
    /// flip the direction, anything else starts descending.
    fn sort_toggle(
        &self,
        col_path: &[Value],
        row_path: &[Value],
        ordinal: usize,
    ) -> ClickDescriptor {
        let parent = &row_path[..row_path.len() - 1];
        let target = SortTarget::Measure {
            value_index: ordinal,
            column_path: col_path.to_vec(),
        };
        let direction = match self.sort_rules.get(parent) {
            Some(rule) if rule.target == target => rule.direction.toggled(),
            _ => SortDirection::Descending,
        };
        ClickDescriptor::SortToggle {
            path_key: encode_path(parent),
            rule: SortRule { target, direction },
        }
    }
}
