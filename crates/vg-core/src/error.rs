//! # Core Errors
//!
//! Every failure the value, row and table layer can report. Evaluation
//! errors carry the operator and operand kinds so callers can print a
//! useful diagnostic; structural errors describe the contract that was
//! broken.

use thiserror::Error;

use crate::row::RowShape;
use crate::value::ScalarKind;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Evaluation errors
    // =========================================================================
    /// The operator has no meaning for this pair of kinds.
    #[error("undefined operation: {lhs} {op} {rhs}")]
    UndefinedOperation {
        op: &'static str,
        lhs: ScalarKind,
        rhs: ScalarKind,
    },

    /// The operator is meaningful for the kinds, but not for these operands.
    #[error("invalid operation: {lhs} {op} {rhs} ({reason})")]
    InvalidOperation {
        op: &'static str,
        lhs: ScalarKind,
        rhs: ScalarKind,
        reason: &'static str,
    },

    #[error("item not found: {0}")]
    ItemNotFound(String),

    // =========================================================================
    // Structural errors
    // =========================================================================
    #[error("row is frozen; cells can no longer be appended")]
    RowFrozen,

    #[error("row must be frozen before it is added to a table")]
    RowNotFrozen,

    #[error("cell {position} has kind {got}, row shape expects {expected}")]
    CellKindMismatch {
        position: usize,
        expected: ScalarKind,
        got: ScalarKind,
    },

    #[error("row shape holds {capacity} cells; cannot append another")]
    RowTooLong { capacity: usize },

    #[error("row shape {got} does not match table shape {expected}")]
    ShapeMismatch { expected: RowShape, got: RowShape },

    #[error("row has {got} columns, table expects {expected}")]
    ColumnCountMismatch { expected: usize, got: usize },

    #[error("indices are already defined for this table")]
    IndicesAlreadyDefined,

    #[error("column {column} is indexed by {expected} values, got {got}")]
    IndexKindMismatch {
        column: usize,
        expected: ScalarKind,
        got: ScalarKind,
    },
}

impl Error {
    pub(crate) fn undefined(op: &'static str, lhs: ScalarKind, rhs: ScalarKind) -> Self {
        Self::UndefinedOperation { op, lhs, rhs }
    }

    pub(crate) fn invalid(
        op: &'static str,
        lhs: ScalarKind,
        rhs: ScalarKind,
        reason: &'static str,
    ) -> Self {
        Self::InvalidOperation {
            op,
            lhs,
            rhs,
            reason,
        }
    }
}
