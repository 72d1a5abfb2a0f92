//! FILENAME: crosstab-engine/src/subtotal.rs
//! Subtotal Index - Pre-aggregated value tuples keyed by grain and values.
//!
//! Every total shown anywhere in the pivot (subtotal rows, the row-totals
//! column, the grand-total corner) was already computed by the query at some
//! coarser grain. This index makes those rows addressable: no value is ever
//! re-aggregated on this side.

use rustc_hash::FxHashMap;

use resultset::Value;

use crate::key::{GrainKey, ValueKey};
use crate::split::SliceMap;

/// Value tuples of every slice, keyed `[grain][values in grain order]`.
#[derive(Debug, Clone, Default)]
pub struct SubtotalIndex {
    tables: FxHashMap<GrainKey, FxHashMap<ValueKey, Vec<Value>>>,
}

impl SubtotalIndex {
    /// Indexes all slices, the primary one included: full-length probes
    /// (leaf sorts, fully-pinned totals) resolve through the same path.
    pub fn build(slices: &SliceMap, value_positions: &[usize]) -> Self {
        let mut tables: FxHashMap<GrainKey, FxHashMap<ValueKey, Vec<Value>>> =
            FxHashMap::default();

        for (grain, rows) in slices.iter() {
            let table = tables.entry(grain.clone()).or_default();
            for row in rows {
                let key = ValueKey::for_row(grain, row);
                let values: Vec<Value> =
                    value_positions.iter().map(|&p| row[p].clone()).collect();
                table.insert(key, values);
            }
        }

        SubtotalIndex { tables }
    }

    /// Looks up the value tuple for a set of pinned (position, value) pairs.
    /// Pair order is irrelevant; the probe canonicalizes exactly like the
    /// build side. Unknown grains or combinations yield `None`.
    pub fn lookup(&self, pairs: impl IntoIterator<Item = (usize, Value)>) -> Option<&[Value]> {
        let (grain, key) = ValueKey::from_pairs(pairs);
        self.tables
            .get(&grain)?
            .get(&key)
            .map(|values| values.as_slice())
    }

    pub fn grain_count(&self) -> usize {
        self.tables.len()
    }
}
