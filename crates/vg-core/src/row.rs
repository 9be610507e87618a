//! # Rows
//!
//! A [`Row`] is an ordered, fixed-arity tuple of shared values. Rows start
//! open, accept cells through [`Row::append`], and are frozen exactly once,
//! after which their [`RowShape`] is fixed.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{ItemId, ScalarKind, SharedValue, Value};

/// Reference-counted handle to a [`Row`]. Tables and callers share rows
/// through this handle; the row releases its cells when the last handle drops.
pub type SharedRow = Arc<Row>;

/// The ordered list of cell kinds of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowShape(Vec<ScalarKind>);

impl RowShape {
    pub fn new(kinds: Vec<ScalarKind>) -> Self {
        Self(kinds)
    }

    pub fn kinds(&self) -> &[ScalarKind] {
        &self.0
    }

    pub fn kind(&self, position: usize) -> Option<ScalarKind> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ScalarKind> for RowShape {
    fn from_iter<I: IntoIterator<Item = ScalarKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RowShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{kind}")?;
        }
        f.write_str(")")
    }
}

/// An ordered tuple of shared scalar values.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<SharedValue>,
    /// Kinds of the cells appended so far.
    shape: RowShape,
    /// Shape imposed at construction; appended cells must follow it.
    expected: Option<RowShape>,
    frozen: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an open row whose cells must follow `shape`.
    pub fn with_shape(shape: RowShape) -> Self {
        Self {
            cells: Vec::with_capacity(shape.len()),
            shape: RowShape::default(),
            expected: Some(shape),
            frozen: false,
        }
    }

    /// Build a frozen row from plain values.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let cells: Vec<SharedValue> = values.into_iter().map(Arc::new).collect();
        let shape = cells.iter().map(|c| c.kind()).collect();
        Self {
            cells,
            shape,
            expected: None,
            frozen: true,
        }
    }

    /// Append a cell, taking over the caller's reference.
    pub fn append(&mut self, cell: SharedValue) -> Result<()> {
        if self.frozen {
            return Err(Error::RowFrozen);
        }
        let position = self.cells.len();
        if let Some(expected) = &self.expected {
            let Some(kind) = expected.kind(position) else {
                return Err(Error::RowTooLong {
                    capacity: expected.len(),
                });
            };
            if kind != cell.kind() {
                return Err(Error::CellKindMismatch {
                    position,
                    expected: kind,
                    got: cell.kind(),
                });
            }
        }
        self.shape.0.push(cell.kind());
        self.cells.push(cell);
        Ok(())
    }

    /// Append a cell, taking an additional reference to it.
    pub fn append_shared(&mut self, cell: &SharedValue) -> Result<()> {
        self.append(Arc::clone(cell))
    }

    pub fn append_value(&mut self, value: Value) -> Result<()> {
        self.append(Arc::new(value))
    }

    /// Lock the shape. A second call is a no-op.
    pub fn freeze(&mut self) {
        if self.frozen {
            tracing::warn!("Row with shape {} is already frozen", self.shape);
            return;
        }
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn shape(&self) -> &RowShape {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&SharedValue> {
        self.cells.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedValue> {
        self.cells.iter()
    }

    /// First cell carrying `id`.
    pub fn find_by_id(&self, id: ItemId) -> Option<&SharedValue> {
        self.cells.iter().find(|c| c.id() == id)
    }

    /// Every cell carrying `id`, in row order.
    pub fn find_all_by_id(&self, id: ItemId) -> Vec<&SharedValue> {
        self.cells.iter().filter(|c| c.id() == id).collect()
    }

    pub fn into_shared(self) -> SharedRow {
        Arc::new(self)
    }
}
