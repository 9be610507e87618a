//! # Formula Errors
//!
//! Parse errors are fatal to the statement being parsed; the parser never
//! returns a partial tree. Evaluation errors are raised only for genuine
//! type violations. A missing operand is not an error: evaluation returns
//! `Ok(None)` instead.

use thiserror::Error;

pub type ParseResult<T> = std::result::Result<T, ParseError>;
pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    /// A node arrived where the tree has no free slot for it.
    #[error("unexpected {0} in expression")]
    Misplaced(&'static str),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("malformed {keyword}: {reason}")]
    Malformed {
        keyword: &'static str,
        reason: String,
    },

    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,

    #[error("{function}() takes {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("IN list is empty")]
    EmptyInList,

    #[error("incomplete expression: {0} is missing an operand")]
    Incomplete(&'static str),

    #[error("unterminated quoted string starting at offset {0}")]
    UnterminatedQuote(usize),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("IN list longer than {0} values")]
    TooManyValues(usize),

    #[error("statement of {len} bytes exceeds the {limit}-byte limit")]
    TooLong { len: usize, limit: usize },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error(transparent)]
    Value(#[from] vg_core::Error),
}

impl ParseError {
    pub(crate) fn malformed(keyword: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            keyword,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error(transparent)]
    Value(#[from] vg_core::Error),

    #[error("EXISTS is not supported by this evaluation context")]
    ExistsUnsupported,

    #[error("EXISTS sub-query failed: {0}")]
    Exists(String),
}
