//! FILENAME: crosstab-engine/src/key.rs
//! Canonical composite keys for slices and subtotal tables.
//!
//! A grain is "which breakout columns this row was grouped by", a value key
//! is "the values of those columns". Both sides of every lookup build their
//! keys through the same canonicalization (positions sorted ascending,
//! values carried in position order), so probes assembled from column-path
//! and row-path fragments land on keys built from whole rows.

use smallvec::SmallVec;

use resultset::Value;

// ============================================================================
// GRAIN KEY
// ============================================================================

/// The set of breakout column positions a slice is grouped by, sorted
/// ascending. The grain containing every breakout position is the primary
/// grain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrainKey {
    positions: SmallVec<[usize; 4]>,
}

impl GrainKey {
    pub fn new(positions: impl IntoIterator<Item = usize>) -> Self {
        let mut positions: SmallVec<[usize; 4]> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();
        GrainKey { positions }
    }

    /// Decodes a grouping bitmask: bit `i` set means the `i`-th breakout was
    /// grouped away, so the grain keeps the positions of the clear bits.
    pub fn from_bitmask(mask: u64, breakout_positions: &[usize]) -> Self {
        let positions = breakout_positions
            .iter()
            .enumerate()
            .filter(|(ordinal, _)| (mask >> ordinal) & 1 == 0)
            .map(|(_, position)| *position)
            .collect();
        GrainKey { positions }
    }

    /// Re-encodes the grain as a grouping bitmask over the given breakouts.
    pub fn to_bitmask(&self, breakout_positions: &[usize]) -> u64 {
        breakout_positions
            .iter()
            .enumerate()
            .filter(|(_, position)| !self.contains(**position))
            .fold(0u64, |mask, (ordinal, _)| mask | 1 << ordinal)
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.binary_search(&position).is_ok()
    }
}

// ============================================================================
// VALUE KEY
// ============================================================================

/// Breakout values arranged in their grain's position order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKey {
    values: SmallVec<[Value; 4]>,
}

impl ValueKey {
    /// Builds the key for a stored row: values taken at the grain's
    /// positions, already in canonical order.
    pub fn for_row(grain: &GrainKey, row: &[Value]) -> Self {
        ValueKey {
            values: grain.positions.iter().map(|&p| row[p].clone()).collect(),
        }
    }

    /// Canonicalizes loose (position, value) pairs into the same
    /// (grain, key) a whole row would produce, regardless of pair order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, Value)>) -> (GrainKey, ValueKey) {
        let mut pairs: Vec<(usize, Value)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(position, _)| *position);

        let grain = GrainKey {
            positions: pairs.iter().map(|(position, _)| *position).collect(),
        };
        let key = ValueKey {
            values: pairs.into_iter().map(|(_, value)| value).collect(),
        };
        (grain, key)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
