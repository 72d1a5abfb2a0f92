//! FILENAME: crosstab-engine/src/error.rs

use resultset::Value;
use thiserror::Error;

/// Errors for broken caller contracts.
///
/// Absent data never errors: a missing subtotal or leaf resolves to a null
/// cell, and split references that match no result column are dropped. These
/// variants cover the cases where the input itself is corrupt and producing
/// a pivot would silently lie.
#[derive(Error, Debug)]
pub enum PivotError {
    #[error("result set has no \"pivot-grouping\" column; the query did not run as a pivot")]
    MissingGroupingColumn,

    #[error("row {row}: grouping column holds {value:?}, expected a non-negative integer")]
    InvalidGroupingValue { row: usize, value: Value },

    #[error("malformed collapsed-subtotal entry {raw:?}: {source}")]
    InvalidCollapsedPath {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed sort-order key {raw:?}: {source}")]
    InvalidSortKey {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}
