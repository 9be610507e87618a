//! # Column Indices
//!
//! Equality lookup from a value to the rows holding it in one column.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::row::SharedRow;
use crate::value::{DatumKey, ScalarKind, Value};

/// Index request for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPolicy {
    /// No index on this column.
    #[default]
    None,
    /// Exact-match lookup.
    Exact,
}

/// Exact-match index over one table column.
///
/// The first inserted value fixes the index kind; later values of another
/// kind are rejected.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    column: usize,
    kind: Option<ScalarKind>,
    entries: HashMap<DatumKey, Vec<SharedRow>>,
}

impl ColumnIndex {
    pub fn new(column: usize) -> Self {
        Self {
            column,
            kind: None,
            entries: HashMap::new(),
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn kind(&self) -> Option<ScalarKind> {
        self.kind
    }

    /// Number of distinct keys.
    pub fn distinct_len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that `value` may be inserted without changing the index kind.
    pub fn check(&self, value: &Value) -> Result<()> {
        match self.kind {
            Some(kind) if kind != value.kind() => Err(Error::IndexKindMismatch {
                column: self.column,
                expected: kind,
                got: value.kind(),
            }),
            _ => Ok(()),
        }
    }

    pub fn insert(&mut self, value: &Value, row: &SharedRow) -> Result<()> {
        self.check(value)?;
        self.kind.get_or_insert(value.kind());
        self.entries
            .entry(value.key())
            .or_default()
            .push(Arc::clone(row));
        Ok(())
    }

    /// Rows whose cell in this column equals `value`, in insertion order.
    pub fn find(&self, value: &Value) -> &[SharedRow] {
        self.entries
            .get(&value.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    #[test]
    fn test_insert_and_find() {
        let mut index = ColumnIndex::new(0);
        let r1 = Row::from_values([Value::int32(1)]).into_shared();
        let r2 = Row::from_values([Value::int32(1)]).into_shared();
        let r3 = Row::from_values([Value::int32(2)]).into_shared();
        index.insert(&Value::int32(1), &r1).unwrap();
        index.insert(&Value::int32(1), &r2).unwrap();
        index.insert(&Value::int32(2), &r3).unwrap();

        assert_eq!(index.find(&Value::int32(1)).len(), 2);
        assert!(Arc::ptr_eq(&index.find(&Value::int32(2))[0], &r3));
        assert!(index.find(&Value::int32(3)).is_empty());
        assert_eq!(index.distinct_len(), 2);
        assert_eq!(index.kind(), Some(ScalarKind::Int32));
    }

    #[test]
    fn test_insert_rejects_other_kind() {
        let mut index = ColumnIndex::new(3);
        let row = Row::from_values([Value::int32(1)]).into_shared();
        index.insert(&Value::int32(1), &row).unwrap();
        assert_eq!(
            index.insert(&Value::string("1"), &row),
            Err(Error::IndexKindMismatch {
                column: 3,
                expected: ScalarKind::Int32,
                got: ScalarKind::String,
            })
        );
        assert_eq!(index.distinct_len(), 1);
    }
}
