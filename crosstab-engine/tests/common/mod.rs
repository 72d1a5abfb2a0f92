//! FILENAME: crosstab-engine/tests/common/mod.rs
//! Fixtures and assertion helpers for pivot engine integration tests.

use crosstab_engine::{ColumnRef, ColumnSplit, HeaderItem, PivotOutput, PivotSettings};
use resultset::{ColumnSpec, ResultSet, Value, GROUPING_COLUMN};
use rustc_hash::FxHashMap;

// ============================================================================
// TAGGED RESULT SET SYNTHESIS
// ============================================================================

/// Builds the kind of result set a pivot query produces: the same SUM
/// aggregation run once per grain and unioned together, with the hidden
/// grouping column recording as a bitmask which breakouts each row grouped
/// away.
///
/// `base_rows` holds the finest grain: one entry per full breakout
/// combination, with one number per measure.
pub fn tagged_result_set(
    breakouts: &[&str],
    measures: &[&str],
    base_rows: &[(Vec<Value>, Vec<f64>)],
) -> ResultSet {
    let mut cols: Vec<ColumnSpec> = breakouts
        .iter()
        .map(|name| ColumnSpec::breakout(*name))
        .collect();
    cols.extend(measures.iter().map(|name| ColumnSpec::aggregation(*name)));
    cols.push(ColumnSpec::breakout(GROUPING_COLUMN));

    let mut rows = Vec::new();
    for mask in 0u64..(1u64 << breakouts.len()) {
        // Re-aggregate the base rows at this grain: excluded breakouts
        // become null, measures are summed. First-seen key order is kept so
        // the union reads like real query output.
        let mut order: Vec<Vec<Value>> = Vec::new();
        let mut sums: FxHashMap<Vec<Value>, Vec<f64>> = FxHashMap::default();
        for (values, metrics) in base_rows {
            let key: Vec<Value> = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    if mask & (1 << i) != 0 {
                        Value::Null
                    } else {
                        v.clone()
                    }
                })
                .collect();
            match sums.get_mut(&key) {
                Some(totals) => {
                    for (total, metric) in totals.iter_mut().zip(metrics) {
                        *total += metric;
                    }
                }
                None => {
                    order.push(key.clone());
                    sums.insert(key, metrics.clone());
                }
            }
        }

        for key in order {
            let totals = sums.remove(&key).unwrap();
            let mut row = key;
            row.extend(totals.into_iter().map(Value::from));
            row.push(Value::from(mask as f64));
            rows.push(row);
        }
    }

    ResultSet::new(cols, rows)
}

/// Builds a `ColumnSplit` from column names.
pub fn split(rows: &[&str], columns: &[&str], values: &[&str]) -> ColumnSplit {
    ColumnSplit {
        rows: refs(rows),
        columns: refs(columns),
        values: refs(values),
    }
}

fn refs(names: &[&str]) -> Vec<ColumnRef> {
    names.iter().map(|name| ColumnRef(name.to_string())).collect()
}

/// Shorthand for a path of text values.
pub fn text_path(parts: &[&str]) -> Vec<Value> {
    parts.iter().map(|part| Value::text(*part)).collect()
}

// ============================================================================
// TEST DATA FIXTURES
// ============================================================================

/// Sample sales data used by most tests: three regions by two products by
/// two quarters, with two measures.
pub struct SalesFixture;

impl SalesFixture {
    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    /// The full tagged result set: twelve primary rows plus every coarser
    /// grain, 36 rows over 8 grains.
    pub fn result_set() -> ResultSet {
        let base: Vec<(Vec<Value>, Vec<f64>)> = Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                (
                    vec![
                        Value::text(region),
                        Value::text(product),
                        Value::text(quarter),
                    ],
                    vec![sales, quantity],
                )
            })
            .collect();
        tagged_result_set(&["Region", "Product", "Quarter"], &["Sales", "Quantity"], &base)
    }

    /// Region and Product on rows, Quarter on columns, both measures.
    pub fn settings() -> PivotSettings {
        PivotSettings::with_split(split(
            &["Region", "Product"],
            &["Quarter"],
            &["Sales", "Quantity"],
        ))
    }

    /// Same split with Sales only.
    pub fn single_measure_settings() -> PivotSettings {
        PivotSettings::with_split(split(&["Region", "Product"], &["Quarter"], &["Sales"]))
    }
}

/// Minimal two-breakout data set: categories A/B crossed incompletely with
/// codes X/Y, one measure. The (B, Y) combination has no row.
pub struct LetterFixture;

impl LetterFixture {
    pub fn data() -> Vec<(&'static str, &'static str, f64)> {
        vec![("A", "X", 1.0), ("A", "Y", 2.0), ("B", "X", 3.0)]
    }

    pub fn result_set() -> ResultSet {
        let base: Vec<(Vec<Value>, Vec<f64>)> = Self::data()
            .into_iter()
            .map(|(category, code, count)| {
                (vec![Value::text(category), Value::text(code)], vec![count])
            })
            .collect();
        tagged_result_set(&["Category", "Code"], &["Count"], &base)
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Labels of a flattened header band, in render order.
pub fn labels(items: &[HeaderItem]) -> Vec<String> {
    items.iter().map(|item| item.label.clone()).collect()
}

/// Labels of the band's top level only.
pub fn root_labels(items: &[HeaderItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.depth == 0)
        .map(|item| item.label.clone())
        .collect()
}

/// Index of the row whose value path equals `path`.
pub fn row_index(output: &PivotOutput, path: &[Value]) -> usize {
    output
        .row_paths
        .iter()
        .position(|p| p == path)
        .unwrap_or_else(|| panic!("no row with path {:?} in {:?}", path, output.row_paths))
}

/// Index of the column whose value path equals `path`.
pub fn column_index(output: &PivotOutput, path: &[Value]) -> usize {
    output
        .column_paths
        .iter()
        .position(|p| p == path)
        .unwrap_or_else(|| panic!("no column with path {:?} in {:?}", path, output.column_paths))
}

/// Assert that a body section holds exactly the expected numbers, in order.
pub fn assert_section_numbers(
    output: &mut PivotOutput,
    col_idx: usize,
    row_idx: usize,
    expected: &[f64],
) {
    let cells = output.row_section(col_idx, row_idx);
    assert_eq!(
        cells.len(),
        expected.len(),
        "section ({}, {}) expected {} cells but got {}",
        col_idx,
        row_idx,
        expected.len(),
        cells.len()
    );
    for (i, (cell, want)) in cells.iter().zip(expected).enumerate() {
        match cell.value.as_f64() {
            Some(got) => assert!(
                (got - want).abs() < 1e-9,
                "section ({}, {}) cell {} expected {} but got {}",
                col_idx,
                row_idx,
                i,
                want,
                got
            ),
            None => panic!(
                "section ({}, {}) cell {} expected Number({}) but got {:?}",
                col_idx, row_idx, i, want, cell.value
            ),
        }
    }
}

/// Assert that a header band is structurally sound: per-depth offsets
/// strictly increase, root spans cover every leaf exactly once, and each
/// parent's span equals the sum of its direct children's spans.
pub fn assert_band_well_formed(items: &[HeaderItem], leaf_count: usize, band: &str) {
    let root_total: usize = items
        .iter()
        .filter(|item| item.depth == 0)
        .map(|item| item.span)
        .sum();
    assert_eq!(
        root_total, leaf_count,
        "{}: root spans cover {} leaves, expected {}",
        band, root_total, leaf_count
    );

    let max_depth = items.iter().map(|item| item.depth).max().unwrap_or(0);
    for depth in 0..=max_depth {
        let offsets: Vec<usize> = items
            .iter()
            .filter(|item| item.depth == depth)
            .map(|item| item.offset)
            .collect();
        for pair in offsets.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{}: offsets not strictly increasing at depth {}: {:?}",
                band, depth, offsets
            );
        }
    }

    for item in items.iter().filter(|item| item.has_children) {
        let child_total: usize = items
            .iter()
            .filter(|child| {
                child.depth == item.depth + 1
                    && child.offset >= item.offset
                    && child.offset < item.offset + item.span
            })
            .map(|child| child.span)
            .sum();
        assert_eq!(
            child_total, item.span,
            "{}: item '{}' spans {} leaves but its children span {}",
            band, item.label, item.span, child_total
        );
    }
}
