//! # vg-core — The "Physics" of VIGIL
//!
//! Defines the data every query runs over. Monitoring items arrive as typed
//! scalar [`Value`]s, are grouped into [`Row`]s, and rows of one
//! [`RowShape`] are collected into a [`Table`] that can carry per-column
//! [`ColumnIndex`]es for equality lookup.
//!
//! Values, rows and tables are shared through `Arc` handles. A value held by
//! three rows and an evaluation result is dropped exactly once, when the
//! last of those lets go, regardless of which thread that happens on.
//!
//! Tables are not internally synchronized. A caller that appends from one
//! thread while another iterates must serialize access itself.

pub mod error;
pub mod index;
pub mod row;
pub mod table;
pub mod value;

pub use error::{Error, Result};
pub use index::{ColumnIndex, IndexPolicy};
pub use row::{Row, RowShape, SharedRow};
pub use table::{SharedTable, Table};
pub use value::{
    compare_signed_unsigned, Comparison, Datum, DatumKey, ItemId, ScalarKind, SharedValue, Value,
    ANONYMOUS_ITEM_ID,
};
