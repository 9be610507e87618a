//! # Tables
//!
//! An ordered collection of same-shaped rows with optional per-column
//! equality indices.
//!
//! # Invariants
//!
//! - Every row shares the shape of the first row appended.
//! - Once indices are defined, every row is present in every index, both
//!   rows appended afterwards and rows that were already there.
//! - Index presence follows [`Table::has_index`], not row content: cloning a
//!   table shares its rows but drops its indices.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::index::{ColumnIndex, IndexPolicy};
use crate::row::{RowShape, SharedRow};
use crate::value::Value;

/// Reference-counted handle to a [`Table`].
pub type SharedTable = Arc<Table>;

#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<SharedRow>,
    /// One slot per column when indices are defined.
    indices: Option<Vec<Option<ColumnIndex>>>,
}

impl Clone for Table {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            indices: None,
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frozen row, updating every defined index before the row
    /// becomes visible.
    pub fn append(&mut self, row: SharedRow) -> Result<()> {
        if !row.is_frozen() {
            return Err(Error::RowNotFrozen);
        }
        if let Some(first) = self.rows.first() {
            if first.shape() != row.shape() {
                return Err(Error::ShapeMismatch {
                    expected: first.shape().clone(),
                    got: row.shape().clone(),
                });
            }
        } else if let Some(indices) = &self.indices {
            if indices.len() != row.len() {
                return Err(Error::ColumnCountMismatch {
                    expected: indices.len(),
                    got: row.len(),
                });
            }
        }

        if let Some(indices) = self.indices.as_mut() {
            update_indices(indices, &row)?;
        }
        self.rows.push(row);
        Ok(())
    }

    /// Define one index slot per column and back-fill from existing rows.
    pub fn define_indices(&mut self, policies: &[IndexPolicy]) -> Result<()> {
        if self.indices.is_some() {
            return Err(Error::IndicesAlreadyDefined);
        }
        if let Some(first) = self.rows.first() {
            if first.len() != policies.len() {
                return Err(Error::ColumnCountMismatch {
                    expected: first.len(),
                    got: policies.len(),
                });
            }
        }

        let mut indices: Vec<Option<ColumnIndex>> = policies
            .iter()
            .enumerate()
            .map(|(column, policy)| match policy {
                IndexPolicy::Exact => Some(ColumnIndex::new(column)),
                IndexPolicy::None => None,
            })
            .collect();
        for row in &self.rows {
            update_indices(&mut indices, row)?;
        }

        tracing::debug!(
            "Defined {} column indices, back-filled from {} rows",
            indices.iter().flatten().count(),
            self.rows.len()
        );
        self.indices = Some(indices);
        Ok(())
    }

    pub fn has_index(&self) -> bool {
        self.indices.is_some()
    }

    pub fn index(&self, column: usize) -> Option<&ColumnIndex> {
        self.indices.as_ref()?.get(column)?.as_ref()
    }

    /// Rows whose `column` equals `value`, or `None` when that column has
    /// no index.
    pub fn lookup(&self, column: usize, value: &Value) -> Option<&[SharedRow]> {
        self.index(column).map(|index| index.find(value))
    }

    pub fn rows(&self) -> &[SharedRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shape shared by all rows, once the first row is in.
    pub fn shape(&self) -> Option<&RowShape> {
        self.rows.first().map(|row| row.shape())
    }

    pub fn into_shared(self) -> SharedTable {
        Arc::new(self)
    }
}

/// Insert `row` into every defined index. All cells are checked before any
/// index is touched, so a rejected row leaves the indices unchanged.
fn update_indices(indices: &mut [Option<ColumnIndex>], row: &SharedRow) -> Result<()> {
    for (column, index) in indices.iter().enumerate() {
        if let Some(index) = index {
            let cell = row.get(column).ok_or(Error::ColumnCountMismatch {
                expected: indices.len(),
                got: row.len(),
            })?;
            index.check(cell)?;
        }
    }
    for (column, index) in indices.iter_mut().enumerate() {
        if let (Some(index), Some(cell)) = (index.as_mut(), row.get(column)) {
            index.insert(cell, row)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::value::ScalarKind;

    fn row(id: i32, name: &str) -> SharedRow {
        Row::from_values([Value::int32(id), Value::string(name)]).into_shared()
    }

    #[test]
    fn test_first_row_fixes_shape() {
        let mut table = Table::new();
        table.append(row(1, "a")).unwrap();
        let odd = Row::from_values([Value::string("a"), Value::int32(1)]).into_shared();
        assert!(matches!(table.append(odd), Err(Error::ShapeMismatch { .. })));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.shape(),
            Some(&RowShape::new(vec![ScalarKind::Int32, ScalarKind::String]))
        );
    }

    #[test]
    fn test_open_row_is_rejected() {
        let mut table = Table::new();
        let mut open = Row::new();
        open.append_value(Value::int32(1)).unwrap();
        assert_eq!(table.append(open.clone().into_shared()), Err(Error::RowNotFrozen));
        assert!(table.is_empty());

        open.freeze();
        table.append(open.into_shared()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_indices_before_rows_fix_column_count() {
        let mut table = Table::new();
        table
            .define_indices(&[IndexPolicy::Exact, IndexPolicy::None, IndexPolicy::None])
            .unwrap();
        assert_eq!(
            table.append(row(1, "a")),
            Err(Error::ColumnCountMismatch {
                expected: 3,
                got: 2
            })
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_define_indices_back_fills_existing_rows() {
        let mut table = Table::new();
        let rows = [row(1, "a"), row(2, "b"), row(1, "c")];
        for r in &rows {
            table.append(Arc::clone(r)).unwrap();
        }
        table
            .define_indices(&[IndexPolicy::Exact, IndexPolicy::Exact])
            .unwrap();

        let ones = table.lookup(0, &Value::int32(1)).unwrap();
        assert_eq!(ones.len(), 2);
        assert!(Arc::ptr_eq(&ones[0], &rows[0]));
        assert!(Arc::ptr_eq(&ones[1], &rows[2]));
        for r in &rows {
            let name = r.get(1).unwrap();
            assert_eq!(table.lookup(1, name).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_append_updates_indices() {
        let mut table = Table::new();
        table
            .define_indices(&[IndexPolicy::None, IndexPolicy::Exact])
            .unwrap();
        table.append(row(1, "a")).unwrap();
        table.append(row(2, "a")).unwrap();
        assert_eq!(table.lookup(1, &Value::string("a")).unwrap().len(), 2);
        assert!(table.lookup(0, &Value::int32(1)).is_none());
        assert!(table.index(0).is_none());
    }

    #[test]
    fn test_define_indices_twice_fails() {
        let mut table = Table::new();
        table.define_indices(&[IndexPolicy::Exact]).unwrap();
        assert_eq!(
            table.define_indices(&[IndexPolicy::Exact]),
            Err(Error::IndicesAlreadyDefined)
        );
    }

    #[test]
    fn test_define_indices_with_wrong_width_fails() {
        let mut table = Table::new();
        table.append(row(1, "a")).unwrap();
        assert!(matches!(
            table.define_indices(&[IndexPolicy::Exact]),
            Err(Error::ColumnCountMismatch { .. })
        ));
        assert!(!table.has_index());
    }

    #[test]
    fn test_clone_shares_rows_but_not_indices() {
        let mut table = Table::new();
        table.append(row(1, "a")).unwrap();
        table.define_indices(&[IndexPolicy::Exact, IndexPolicy::None]).unwrap();

        let mut copy = table.clone();
        assert!(!copy.has_index());
        assert!(Arc::ptr_eq(&copy.rows()[0], &table.rows()[0]));

        copy.define_indices(&[IndexPolicy::Exact, IndexPolicy::None]).unwrap();
        assert_eq!(copy.lookup(0, &Value::int32(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_rows_released_with_last_table() {
        let r = row(5, "x");
        let weak = Arc::downgrade(&r);
        let mut table = Table::new();
        table.append(r).unwrap();
        let shared = table.into_shared();
        let other = Arc::clone(&shared);
        drop(shared);
        assert!(weak.upgrade().is_some());
        drop(other);
        assert!(weak.upgrade().is_none());
    }
}
