//! # Variables and Evaluation Contexts
//!
//! A parser turns every bare identifier into a [`Variable`] through a
//! [`VariableFactory`]; at evaluation time an [`EvalContext`] resolves the
//! variable to a value for the row being tested.

use std::collections::HashMap;

use vg_core::{Row, SharedValue};

use crate::error::{EvalError, EvalResult, ParseError, ParseResult};

/// A column reference, optionally bound to a position at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    column: Option<usize>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
        }
    }

    pub fn bound(name: impl Into<String>, column: usize) -> Self {
        Self {
            name: name.into(),
            column: Some(column),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }
}

/// Creates the variable for an identifier the parser could not read as a
/// literal or keyword.
pub trait VariableFactory {
    fn create(&self, name: &str) -> ParseResult<Variable>;
}

/// Accepts every identifier as an unbound, name-only variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedVariables;

impl VariableFactory for NamedVariables {
    fn create(&self, name: &str) -> ParseResult<Variable> {
        Ok(Variable::new(name))
    }
}

/// Binds identifiers to column positions. Unknown names fail the parse.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<String, usize>,
}

impl ColumnMap {
    /// Map each name to its position in `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| (name.into(), position))
            .collect();
        Self { columns }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl VariableFactory for ColumnMap {
    fn create(&self, name: &str) -> ParseResult<Variable> {
        self.position(name)
            .map(|column| Variable::bound(name, column))
            .ok_or_else(|| ParseError::UnknownVariable(name.to_string()))
    }
}

/// Resolves variables while a formula is evaluated.
pub trait EvalContext {
    /// Current value of `variable`, or `None` when it has none.
    fn variable(&self, variable: &Variable) -> Option<SharedValue>;

    /// Run a deferred `EXISTS` sub-query.
    fn exists(&self, _statement: &str) -> EvalResult<bool> {
        Err(EvalError::ExistsUnsupported)
    }
}

/// Resolves variables by name.
impl EvalContext for HashMap<String, SharedValue> {
    fn variable(&self, variable: &Variable) -> Option<SharedValue> {
        self.get(variable.name()).cloned()
    }
}

/// Runs an `EXISTS` sub-query and reports whether it produced a row. A
/// failure is described by its message.
type ExistsHook<'a> = &'a dyn Fn(&str) -> Result<bool, String>;

/// Resolves bound variables against the cells of one row.
pub struct RowContext<'a> {
    row: &'a Row,
    exists: Option<ExistsHook<'a>>,
}

impl<'a> RowContext<'a> {
    pub fn new(row: &'a Row) -> Self {
        Self { row, exists: None }
    }

    /// Answer `EXISTS` sub-queries with `hook`.
    pub fn with_exists(mut self, hook: ExistsHook<'a>) -> Self {
        self.exists = Some(hook);
        self
    }
}

impl EvalContext for RowContext<'_> {
    fn variable(&self, variable: &Variable) -> Option<SharedValue> {
        self.row.get(variable.column()?).cloned()
    }

    fn exists(&self, statement: &str) -> EvalResult<bool> {
        match self.exists {
            Some(hook) => hook(statement).map_err(EvalError::Exists),
            None => Err(EvalError::ExistsUnsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vg_core::Value;

    #[test]
    fn test_column_map_binds_positions() {
        let map = ColumnMap::new(["id", "name"]);
        assert_eq!(map.create("name").unwrap(), Variable::bound("name", 1));
        assert_eq!(
            map.create("price"),
            Err(ParseError::UnknownVariable("price".to_string()))
        );
    }

    #[test]
    fn test_row_context_reads_cells() {
        let row = Row::from_values([Value::int32(7), Value::string("x")]);
        let ctx = RowContext::new(&row);
        let cell = ctx.variable(&Variable::bound("id", 0)).unwrap();
        assert_eq!(*cell, Value::int32(7));
        assert!(ctx.variable(&Variable::bound("gone", 5)).is_none());
        assert!(ctx.variable(&Variable::new("unbound")).is_none());
    }

    #[test]
    fn test_row_context_exists_hook() {
        let row = Row::new();
        assert_eq!(
            RowContext::new(&row).exists("select 1"),
            Err(EvalError::ExistsUnsupported)
        );
        let hook = |statement: &str| -> Result<bool, String> {
            if statement.starts_with("select") {
                Ok(statement.contains("from"))
            } else {
                Err(format!("cannot run '{statement}'"))
            }
        };
        let ctx = RowContext::new(&row).with_exists(&hook);
        assert_eq!(ctx.exists("select 1 from t"), Ok(true));
        assert_eq!(ctx.exists("select 1"), Ok(false));
        assert_eq!(
            ctx.exists("vacuum"),
            Err(EvalError::Exists("cannot run 'vacuum'".to_string()))
        );
    }
}
