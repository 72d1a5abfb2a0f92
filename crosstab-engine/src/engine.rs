//! FILENAME: crosstab-engine/src/engine.rs
//! Pivot Orchestration - One call from flat result set to renderable output.
//!
//! `pivot` wires the stages together:
//! - Split the tagged rows into grain slices
//! - Index subtotals and primary-slice leaves
//! - Grow, sort, and decorate both axis forests
//! - Flatten headers and enumerate index paths
//! - Hand the body off to a lazy section resolver
//!
//! Every call rebuilds from scratch; no state survives between invocations.

use log::debug;
use rustc_hash::FxHashMap;

use resultset::{ColumnSpec, ResultSet, Value};

use crate::error::PivotError;
use crate::header::{
    add_grand_total, add_subtotals, add_value_nodes, enumerate_leaf_paths, flatten_forest,
    format_forest, DisplayNode, MemoFormatter, GRAND_TOTALS_LABEL, ROW_TOTALS_LABEL,
};
use crate::section::{LeafEntry, SectionResolver};
use crate::settings::{ColumnRef, ColumnSettings, PivotSettings, SortDirection, SortRule};
use crate::split::{split_rows, SliceMap};
use crate::subtotal::SubtotalIndex;
use crate::tree::{apply_sort_rules, build_axis_forest, CollapsedSet};
use crate::view::{BodyCell, Dimension, HeaderItem};

// ============================================================================
// RENDER HOOKS
// ============================================================================

/// Presentation callbacks injected into the engine.
///
/// The engine decides structure; the host decides looks. Implementations
/// must be pure: same inputs, same outputs, no I/O.
pub trait RenderHooks {
    /// Formats one raw value for display.
    fn format_value(&self, value: &Value, settings: &ColumnSettings) -> String;

    /// Background color for one body cell. `source_row` is the ordinal of
    /// the backing row within the primary slice.
    fn color_for(&self, _value: &Value, _source_row: usize, _column: &str) -> Option<String> {
        None
    }

    /// Resolves the effective settings of one column.
    fn settings_for(&self, column: &ColumnSpec) -> ColumnSettings;
}

/// Hooks backed directly by a `PivotSettings`: per-column lookups, general
/// number formatting, no colors.
pub struct BasicHooks<'a> {
    settings: &'a PivotSettings,
}

impl<'a> BasicHooks<'a> {
    pub fn new(settings: &'a PivotSettings) -> Self {
        BasicHooks { settings }
    }
}

impl RenderHooks for BasicHooks<'_> {
    fn format_value(&self, value: &Value, _settings: &ColumnSettings) -> String {
        default_format(value)
    }

    fn settings_for(&self, column: &ColumnSpec) -> ColumnSettings {
        self.settings
            .per_column
            .get(&column.name)
            .cloned()
            .unwrap_or_default()
    }
}

/// Formats a value the way a plain spreadsheet cell would.
pub fn default_format(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(n) => format_general(n.0),
        Value::Text(s) => s.clone(),
        Value::Boolean(true) => "true".to_string(),
        Value::Boolean(false) => "false".to_string(),
    }
}

/// Format a number in general format (auto-detect best representation).
fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();

    // Use scientific notation for very large or very small numbers
    if abs_value >= 1e10 || abs_value < 1e-4 {
        let formatted = format!("{:.5e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => format!(
                "{}e{}",
                mantissa.trim_end_matches('0').trim_end_matches('.'),
                exponent
            ),
            None => formatted,
        };
    }

    // For integers, don't show decimal point
    if value.fract() == 0.0 && abs_value < 1e15 {
        return format!("{:.0}", value);
    }

    // For decimals, show up to 10 significant digits but trim trailing zeros
    format!("{:.10}", value)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

// ============================================================================
// PIVOT OUTPUT
// ============================================================================

/// The assembled pivot: header bands, index paths, and the lazy body.
pub struct PivotOutput<'a> {
    /// Flattened column-axis header items, depth-first.
    pub top_items: Vec<HeaderItem>,

    /// Flattened row-axis header items, depth-first.
    pub left_items: Vec<HeaderItem>,

    /// Value path of every body column section, in render order.
    pub column_paths: Vec<Vec<Value>>,

    /// Value path of every body row section, in render order.
    pub row_paths: Vec<Vec<Value>>,

    /// Number of body row sections, totals included.
    pub row_count: usize,

    /// Number of body column sections, totals included.
    pub column_count: usize,

    /// Positions of the row breakouts among the stripped columns.
    pub row_positions: Vec<usize>,

    /// Positions of the column breakouts among the stripped columns.
    pub column_positions: Vec<usize>,

    /// Positions of the value columns among the stripped columns.
    pub value_positions: Vec<usize>,

    /// Whether measure leaves sit on the row axis.
    pub row_metrics: bool,

    resolver: SectionResolver<'a>,
}

impl<'a> PivotOutput<'a> {
    /// Returns the body section at one (column, row) intersection, building
    /// and memoizing it on first access.
    pub fn row_section(&mut self, col_idx: usize, row_idx: usize) -> &[BodyCell] {
        self.resolver
            .section(col_idx, row_idx, &self.column_paths, &self.row_paths)
    }
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

/// Builds the complete pivot output for one tagged result set.
///
/// Returns `Ok(None)` when the settings carry no column split: the caller
/// renders the flat table instead. Fails fast on a missing grouping column,
/// corrupt bitmask cells, and malformed persisted settings.
pub fn pivot<'a>(
    data: &ResultSet,
    settings: &PivotSettings,
    hooks: &'a dyn RenderHooks,
) -> Result<Option<PivotOutput<'a>>, PivotError> {
    // Step 1: No split configured means nothing to pivot.
    let Some(split) = settings.column_split.as_ref() else {
        return Ok(None);
    };

    // Step 2: Partition the tagged rows into grain slices.
    let (slices, columns) = split_rows(data)?;

    // Step 3: Resolve split references; stale ones drop out silently.
    let row_positions = resolve_positions(&split.rows, &columns);
    let column_positions = resolve_positions(&split.columns, &columns);
    let value_positions = resolve_positions(&split.values, &columns);

    // Step 4: Parse persisted state up front so corrupt settings fail fast.
    let collapsed = CollapsedSet::parse(&settings.collapsed_subtotals)?;
    let sort_rules = parse_sort_rules(&settings.row_sort_order)?;

    // Step 5: Index every slice for subtotal probes, and the primary slice
    // for leaf lookups.
    let subtotals = SubtotalIndex::build(&slices, &value_positions);
    let leaf_values = build_leaf_map(
        &slices,
        &columns,
        &row_positions,
        &column_positions,
        &value_positions,
    );

    // Step 6: Resolve per-column settings once through the hooks.
    let row_specs = specs_at(&columns, &row_positions);
    let column_specs = specs_at(&columns, &column_positions);
    let value_specs = specs_at(&columns, &value_positions);
    let row_settings: Vec<ColumnSettings> =
        row_specs.iter().map(|spec| hooks.settings_for(spec)).collect();
    let column_settings: Vec<ColumnSettings> =
        column_specs.iter().map(|spec| hooks.settings_for(spec)).collect();
    let value_settings: Vec<ColumnSettings> =
        value_specs.iter().map(|spec| hooks.settings_for(spec)).collect();

    // Step 7: Grow both axis forests from the primary slice, then apply the
    // explicit row sort rules.
    let row_sort_orders: Vec<Option<SortDirection>> =
        row_settings.iter().map(|s| s.sort_order).collect();
    let column_sort_orders: Vec<Option<SortDirection>> =
        column_settings.iter().map(|s| s.sort_order).collect();

    let mut row_forest = build_axis_forest(
        slices.primary_rows(),
        &row_positions,
        &row_sort_orders,
        &collapsed,
    );
    let column_forest = build_axis_forest(
        slices.primary_rows(),
        &column_positions,
        &column_sort_orders,
        &CollapsedSet::empty(),
    );
    apply_sort_rules(
        &mut row_forest,
        &sort_rules,
        &row_positions,
        &column_positions,
        &subtotals,
    );

    // Root counts drive the grand total entries; captured before totals
    // reshape the forests.
    let row_roots = row_forest.len();
    let column_roots = column_forest.len();

    // Step 8: Decorate: format, totals, measure leaves.
    let mut row_formatters: Vec<MemoFormatter<'a>> = row_settings
        .iter()
        .map(|s| MemoFormatter::new(hooks, s.clone()))
        .collect();
    let mut column_formatters: Vec<MemoFormatter<'a>> = column_settings
        .iter()
        .map(|s| MemoFormatter::new(hooks, s.clone()))
        .collect();
    let mut row_display = format_forest(row_forest, &row_specs, &mut row_formatters);
    let mut column_display = format_forest(column_forest, &column_specs, &mut column_formatters);

    if settings.show_column_totals {
        let show_by_level: Vec<bool> = row_settings.iter().map(|s| s.shows_totals()).collect();
        row_display = add_subtotals(row_display, &show_by_level, settings.row_totals_on_top);
    }
    let row_grand = settings.show_column_totals && row_roots > 1;
    if row_grand {
        add_grand_total(&mut row_display, GRAND_TOTALS_LABEL, settings.row_totals_on_top);
    }
    let column_grand = settings.show_row_totals && column_roots > 1;
    if column_grand {
        add_grand_total(&mut column_display, ROW_TOTALS_LABEL, false);
    }

    // Step 9: Enumerate index paths before measure leaves reshape the
    // forests. The totals entry resolves through one extra empty path, as
    // does an axis with no split columns.
    let mut row_paths = enumerate_leaf_paths(&row_display);
    if row_grand || row_positions.is_empty() {
        if settings.row_totals_on_top {
            row_paths.insert(0, Vec::new());
        } else {
            row_paths.push(Vec::new());
        }
    }
    let mut column_paths = enumerate_leaf_paths(&column_display);
    if column_grand || column_positions.is_empty() {
        column_paths.push(Vec::new());
    }

    let measures: Vec<DisplayNode> = value_specs
        .iter()
        .zip(&value_settings)
        .map(|(spec, s)| {
            DisplayNode::measure(s.title.clone().unwrap_or_else(|| spec.display_name.clone()))
        })
        .collect();
    let root_path: Vec<Value> = Vec::new();
    let root_rule = sort_rules.get(&root_path);
    if settings.measures_as_rows {
        row_display = add_value_nodes(row_display, &measures, root_rule);
    } else {
        column_display = add_value_nodes(column_display, &measures, root_rule);
    }

    // Step 10: Flatten the header bands.
    let top_items = flatten_forest(&column_display);
    let left_items = flatten_forest(&row_display);

    debug!(
        "pivot built: {}x{} sections from {} slices",
        row_paths.len(),
        column_paths.len(),
        slices.len()
    );

    let resolver = SectionResolver {
        hooks,
        leaf_values,
        subtotals,
        value_formatters: value_settings
            .iter()
            .map(|s| MemoFormatter::new(hooks, s.clone()))
            .collect(),
        value_columns: value_specs,
        row_positions: row_positions.clone(),
        column_positions: column_positions.clone(),
        collapsed,
        sort_rules,
        cache: FxHashMap::default(),
    };

    Ok(Some(PivotOutput {
        top_items,
        left_items,
        row_count: row_paths.len(),
        column_count: column_paths.len(),
        column_paths,
        row_paths,
        row_positions,
        column_positions,
        value_positions,
        row_metrics: settings.measures_as_rows,
        resolver,
    }))
}

/// Maps split references onto stripped-column positions, dropping any that
/// match nothing.
fn resolve_positions(refs: &[ColumnRef], columns: &[ColumnSpec]) -> Vec<usize> {
    refs.iter()
        .filter_map(|column_ref| {
            columns
                .iter()
                .position(|col| col.name == column_ref.as_str())
        })
        .collect()
}

fn specs_at(columns: &[ColumnSpec], positions: &[usize]) -> Vec<ColumnSpec> {
    positions.iter().map(|&p| columns[p].clone()).collect()
}

/// Parses the settings' JSON-keyed sort rules into structural path keys.
fn parse_sort_rules(
    raw: &FxHashMap<String, SortRule>,
) -> Result<FxHashMap<Vec<Value>, SortRule>, PivotError> {
    let mut rules = FxHashMap::default();
    for (raw_key, rule) in raw {
        let path =
            serde_json::from_str::<Vec<Value>>(raw_key).map_err(|source| {
                PivotError::InvalidSortKey {
                    raw: raw_key.clone(),
                    source,
                }
            })?;
        rules.insert(path, rule.clone());
    }
    Ok(rules)
}

/// Files every primary-slice row under its column-path ++ row-path values.
fn build_leaf_map(
    slices: &SliceMap,
    columns: &[ColumnSpec],
    row_positions: &[usize],
    column_positions: &[usize],
    value_positions: &[usize],
) -> FxHashMap<Vec<Value>, LeafEntry> {
    // Breakout pairs ride along in result-column order for filter building.
    let mut dimension_positions: Vec<usize> = row_positions
        .iter()
        .chain(column_positions.iter())
        .copied()
        .collect();
    dimension_positions.sort_unstable();

    let mut leaf_values = FxHashMap::default();
    for (ordinal, row) in slices.primary_rows().iter().enumerate() {
        let mut key = Vec::with_capacity(column_positions.len() + row_positions.len());
        for &position in column_positions {
            key.push(row[position].clone());
        }
        for &position in row_positions {
            key.push(row[position].clone());
        }

        let entry = LeafEntry {
            values: value_positions.iter().map(|&p| row[p].clone()).collect(),
            data: columns
                .iter()
                .zip(row.iter())
                .map(|(col, value)| Dimension::new(&col.name, value.clone()))
                .collect(),
            dimensions: dimension_positions
                .iter()
                .map(|&p| Dimension::new(&columns[p].name, row[p].clone()))
                .collect(),
            source_row: ordinal,
        };
        leaf_values.insert(key, entry);
    }
    leaf_values
}
