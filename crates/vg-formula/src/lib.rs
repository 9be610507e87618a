//! # vg-formula — The "Grammar" of VIGIL
//!
//! Turns the text of a query into formula trees and evaluates them against
//! rows from `vg-core`.
//!
//! - [`parse_columns`] reads a SELECT column list into a [`ColumnList`]:
//!   one formula per output column, with its source text, alias and whether
//!   it aggregates.
//! - [`parse_where`] reads a WHERE predicate into one [`Formula`].
//!
//! Identifiers become variables through a [`VariableFactory`]; an
//! [`EvalContext`] supplies their values at evaluation time.
//!
//! ```
//! use vg_core::{Row, Value};
//! use vg_formula::{parse_where, ColumnMap, RowContext};
//!
//! let columns = ColumnMap::new(["name", "price"]);
//! let mut predicate = parse_where("price BETWEEN 10 AND 20", &columns).unwrap();
//! let row = Row::from_values([Value::string("lamp"), Value::int32(15)]);
//! assert!(predicate.matches(&RowContext::new(&row)).unwrap());
//! ```
//!
//! Formulas are plain owned data. A parsed formula may be moved to another
//! thread, but evaluating it needs `&mut` because aggregates keep state.

pub mod columns;
pub mod config;
pub mod context;
pub mod error;
pub mod formula;
pub mod node;
mod parser;
pub mod predicate;
pub mod tokenizer;

pub use columns::{ColumnFormula, ColumnList, ColumnParser};
pub use config::{EngineConfig, ParserConfig};
pub use context::{ColumnMap, EvalContext, NamedVariables, RowContext, Variable, VariableFactory};
pub use error::{EvalError, EvalResult, ParseError, ParseResult};
pub use formula::Formula;
pub use node::{Aggregate, AggregateFunction, Node, NodeId, NodeKind, Operator, Priority};
pub use predicate::WhereParser;

/// Parse a SELECT column list with default limits.
pub fn parse_columns(text: &str, factory: &dyn VariableFactory) -> ParseResult<ColumnList> {
    ColumnParser::new(factory).parse(text)
}

/// Parse a WHERE predicate with default limits.
pub fn parse_where(text: &str, factory: &dyn VariableFactory) -> ParseResult<Formula> {
    WhereParser::new(factory).parse(text)
}
