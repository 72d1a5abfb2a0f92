//! FILENAME: crosstab-engine/src/lib.rs
//! Crosstab engine: multi-level pivot rendering over tagged result sets.
//!
//! The input is a flat result set whose rows were pre-aggregated at several
//! grains and tagged through a hidden bitmask column; this crate slices it
//! apart, grows header trees per axis, and produces a renderable pivot with
//! lazily resolved body sections. It depends on `resultset` only for the
//! shared data model (Value, ColumnSpec, ResultSet).
//!
//! Layers:
//! - `settings`: Serializable configuration (what the pivot IS)
//! - `split` / `subtotal`: Grain slicing and pre-aggregated lookups
//! - `tree` / `header`: Axis forests and their renderable header bands
//! - `view`: Output data types for the frontend
//! - `section`: Lazy body cell resolution
//! - `engine`: Orchestration (one `pivot` call end to end)

pub mod engine;
pub mod error;
pub mod header;
pub mod key;
mod section;
pub mod settings;
pub mod split;
pub mod subtotal;
pub mod tree;
pub mod view;

pub use engine::{default_format, pivot, BasicHooks, PivotOutput, RenderHooks};
pub use error::PivotError;
pub use header::{GRAND_TOTALS_LABEL, ROW_TOTALS_LABEL};
pub use key::{GrainKey, ValueKey};
pub use settings::{
    encode_path, ColumnRef, ColumnSettings, ColumnSplit, ColumnWidths, PivotSettings,
    SortDirection, SortRule, SortTarget,
};
pub use split::{split_rows, SliceMap};
pub use subtotal::SubtotalIndex;
pub use tree::{AxisNode, CollapsedSet};
pub use view::{BodyCell, ClickDescriptor, Dimension, HeaderItem};
