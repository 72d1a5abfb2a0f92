//! FILENAME: resultset/src/lib.rs
//! Shared result-set contract between the query layer and the pivot engine.
//!
//! This crate holds only the types both sides agree on:
//! - `value`: the scalar cell model (hashable, totally ordered)
//! - `column`: column metadata and the hidden grouping-column convention
//! - `table`: the flat `ResultSet` container

pub mod column;
pub mod table;
pub mod value;

pub use column::{ColumnIndex, ColumnRole, ColumnSpec, GROUPING_COLUMN};
pub use table::ResultSet;
pub use value::{OrderedFloat, Value};
