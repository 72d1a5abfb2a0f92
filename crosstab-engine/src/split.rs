//! FILENAME: crosstab-engine/src/split.rs
//! Group Splitter - Partitions the union of grains back into slices.
//!
//! A pivot query runs the same aggregation once per grain and unions the
//! results, tagging every row with a bitmask in the hidden grouping column.
//! This module undoes the union: rows are partitioned by decoded grain and
//! the grouping column is stripped, leaving each slice shaped like a plain
//! result at that grain.

use log::debug;
use rustc_hash::FxHashMap;

use resultset::{ColumnRole, ColumnSpec, ResultSet, Value};

use crate::error::PivotError;
use crate::key::GrainKey;

// ============================================================================
// SLICE MAP
// ============================================================================

/// All slices of one grouped result, keyed by grain.
#[derive(Debug, Clone)]
pub struct SliceMap {
    slices: FxHashMap<GrainKey, Vec<Vec<Value>>>,

    /// The grain containing every breakout position.
    primary: GrainKey,
}

impl SliceMap {
    /// The finest-grained slice: exactly one row per distinct combination of
    /// breakout values. Header trees and leaf cells come from here.
    pub fn primary_rows(&self) -> &[Vec<Value>] {
        self.slices
            .get(&self.primary)
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn primary_grain(&self) -> &GrainKey {
        &self.primary
    }

    pub fn get(&self, grain: &GrainKey) -> Option<&[Vec<Value>]> {
        self.slices.get(grain).map(|rows| rows.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GrainKey, &[Vec<Value>])> {
        self.slices.iter().map(|(grain, rows)| (grain, rows.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

// ============================================================================
// SPLITTING
// ============================================================================

/// Splits a grouped result into per-grain slices.
///
/// Returns the slices plus the column list with the grouping column removed;
/// every position used downstream (breakouts, measures, probes) indexes into
/// that stripped list.
pub fn split_rows(data: &ResultSet) -> Result<(SliceMap, Vec<ColumnSpec>), PivotError> {
    let grouping_idx = data.grouping_index().ok_or(PivotError::MissingGroupingColumn)?;

    let cols: Vec<ColumnSpec> = data
        .cols
        .iter()
        .filter(|c| !c.is_grouping())
        .cloned()
        .collect();

    // Bit i of the mask refers to the i-th breakout among the stripped
    // columns; positions translate bit ordinals to column indexes.
    let breakout_positions: Vec<usize> = cols
        .iter()
        .enumerate()
        .filter(|(_, c)| c.role == ColumnRole::Breakout)
        .map(|(position, _)| position)
        .collect();

    let mut slices: FxHashMap<GrainKey, Vec<Vec<Value>>> = FxHashMap::default();
    for (row_idx, row) in data.rows.iter().enumerate() {
        let mask = decode_mask(&row[grouping_idx]).ok_or_else(|| {
            PivotError::InvalidGroupingValue {
                row: row_idx,
                value: row[grouping_idx].clone(),
            }
        })?;

        let grain = GrainKey::from_bitmask(mask, &breakout_positions);
        let stripped: Vec<Value> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != grouping_idx)
            .map(|(_, v)| v.clone())
            .collect();
        slices.entry(grain).or_default().push(stripped);
    }

    let primary = GrainKey::new(breakout_positions.iter().copied());
    debug!(
        "split {} rows into {} slices over {} breakouts",
        data.rows.len(),
        slices.len(),
        breakout_positions.len()
    );

    Ok((SliceMap { slices, primary }, cols))
}

fn decode_mask(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) if n.0 >= 0.0 && n.0.fract() == 0.0 => Some(n.0 as u64),
        _ => None,
    }
}
