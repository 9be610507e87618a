//! # Column-List Parser
//!
//! Parses the output list of a SELECT into one [`ColumnFormula`] per
//! comma-separated column:
//!
//! ```text
//! [DISTINCT] expr [AS alias] (, expr [AS alias])*
//! ```
//!
//! `expr` may call the aggregates `MAX`, `COUNT` (optionally `DISTINCT`) and
//! `SUM`, each taking exactly one argument.

use std::collections::HashMap;
use std::mem;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::ParserConfig;
use crate::context::VariableFactory;
use crate::error::{ParseError, ParseResult};
use crate::formula::Formula;
use crate::node::{AggregateFunction, Operator};
use crate::parser::{base_keywords, drive, no_operators, FormulaParser, TokenSink};
use crate::tokenizer::{ScanMode, Separator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Operator(Operator),
    As,
    Distinct,
}

static KEYWORDS: OnceLock<HashMap<&'static str, Keyword>> = OnceLock::new();
static FUNCTIONS: OnceLock<HashMap<&'static str, AggregateFunction>> = OnceLock::new();

fn keywords() -> &'static HashMap<&'static str, Keyword> {
    KEYWORDS.get_or_init(|| {
        let mut map: HashMap<&'static str, Keyword> = base_keywords()
            .iter()
            .map(|(word, op)| (*word, Keyword::Operator(*op)))
            .collect();
        map.insert("as", Keyword::As);
        map.insert("distinct", Keyword::Distinct);
        map
    })
}

fn functions() -> &'static HashMap<&'static str, AggregateFunction> {
    FUNCTIONS.get_or_init(|| {
        HashMap::from([
            ("max", AggregateFunction::Max),
            ("count", AggregateFunction::Count),
            ("sum", AggregateFunction::Sum),
        ])
    })
}

/// One parsed output column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnFormula {
    #[serde(skip)]
    formula: Formula,
    source: String,
    alias: Option<String>,
    has_aggregate: bool,
}

impl ColumnFormula {
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn formula_mut(&mut self) -> &mut Formula {
        &mut self.formula
    }

    /// Expression text as written, without the alias clause.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Heading for the column: the alias when given, else the source text.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source)
    }

    pub fn has_aggregate(&self) -> bool {
        self.has_aggregate
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnList {
    pub columns: Vec<ColumnFormula>,
    /// Set by a leading `DISTINCT`.
    pub distinct: bool,
}

impl ColumnList {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnFormula> {
        self.columns.iter()
    }

    pub fn has_aggregate(&self) -> bool {
        self.columns.iter().any(ColumnFormula::has_aggregate)
    }

    /// Clear the aggregate state of every column, e.g. between groups.
    pub fn reset_statistics(&mut self) {
        for column in &mut self.columns {
            column.formula.reset_statistics();
        }
    }
}

#[derive(Debug)]
enum Alias {
    None,
    Expected,
    Named(String),
}

/// Reusable column-list parser.
pub struct ColumnParser<'f> {
    base: FormulaParser<'f>,
    columns: Vec<ColumnFormula>,
    distinct: bool,
    alias: Alias,
    source: String,
    column_start: usize,
    /// Where the expression of the current column stopped, when `AS` cut it.
    expression_end: Option<usize>,
}

impl<'f> ColumnParser<'f> {
    pub fn new(factory: &'f dyn VariableFactory) -> Self {
        Self::with_config(factory, ParserConfig::default())
    }

    pub fn with_config(factory: &'f dyn VariableFactory, config: ParserConfig) -> Self {
        Self {
            base: FormulaParser::new(factory, config),
            columns: Vec::new(),
            distinct: false,
            alias: Alias::None,
            source: String::new(),
            column_start: 0,
            expression_end: None,
        }
    }

    fn reset(&mut self) {
        self.base.reset();
        self.columns.clear();
        self.distinct = false;
        self.alias = Alias::None;
        self.column_start = 0;
        self.expression_end = None;
    }

    pub fn parse(&mut self, text: &str) -> ParseResult<ColumnList> {
        self.reset();
        self.source = text.to_string();

        let max_len = self.base.config().max_statement_len;
        let result = drive(self, text, max_len).and_then(|()| self.close_column(text.len()));
        if let Err(e) = result {
            self.reset();
            return Err(e);
        }
        let list = ColumnList {
            columns: mem::take(&mut self.columns),
            distinct: self.distinct,
        };
        tracing::debug!(
            "Parsed column list with {} columns (distinct: {})",
            list.len(),
            list.distinct
        );
        self.reset();
        Ok(list)
    }

    /// Snapshot the current column, which ends at byte `end`.
    fn close_column(&mut self, end: usize) -> ParseResult<()> {
        if matches!(self.alias, Alias::Expected) {
            return Err(ParseError::malformed("AS", "missing alias"));
        }
        let formula = self.base.finish(no_operators)?;
        if formula.is_empty() {
            return Err(ParseError::malformed("column list", "empty column"));
        }
        let expression_end = self.expression_end.take().unwrap_or(end);
        let source = self.source[self.column_start..expression_end]
            .trim()
            .to_string();
        let alias = match mem::replace(&mut self.alias, Alias::None) {
            Alias::Named(alias) => Some(alias),
            _ => None,
        };
        self.columns.push(ColumnFormula {
            has_aggregate: formula.has_aggregate(),
            formula,
            source,
            alias,
        });
        self.column_start = end + 1;
        Ok(())
    }

    /// `DISTINCT` ending at byte `end`.
    fn distinct(&mut self, end: usize) -> ParseResult<()> {
        let Some(id) = self.base.open_function() else {
            self.distinct = true;
            if self.base.is_untouched() {
                self.column_start = end;
            }
            return Ok(());
        };
        match self.base.function_mut(id) {
            Some(aggregate) if aggregate.function() == AggregateFunction::Count => {
                aggregate.set_distinct();
                Ok(())
            }
            _ => Err(ParseError::malformed(
                "DISTINCT",
                "only COUNT accepts DISTINCT",
            )),
        }
    }

    fn alias_word(&mut self, word: &str) -> ParseResult<bool> {
        match self.alias {
            Alias::None => Ok(false),
            Alias::Expected => {
                self.alias = Alias::Named(word.to_string());
                Ok(true)
            }
            Alias::Named(_) => Err(ParseError::UnexpectedToken(word.to_string())),
        }
    }
}

impl TokenSink for ColumnParser<'_> {
    fn scan_mode(&self) -> ScanMode {
        ScanMode::Normal
    }

    fn word(&mut self, text: &str, offset: usize) -> ParseResult<()> {
        if self.alias_word(text)? {
            return Ok(());
        }
        let used = self.base.resolve_pending_operator(Some(text), no_operators)?;
        if used > 0 {
            return match &text[used..] {
                "" => Ok(()),
                rest => self.word(rest, offset + used),
            };
        }
        let lower = text.to_ascii_lowercase();
        match keywords().get(lower.as_str()) {
            Some(Keyword::As) => {
                self.base.flush_pending()?;
                if self.base.is_untouched() {
                    return Err(ParseError::malformed("AS", "missing expression"));
                }
                if self.base.depth() > 0 {
                    return Err(ParseError::malformed("AS", "inside parentheses"));
                }
                self.expression_end = Some(offset);
                self.alias = Alias::Expected;
                Ok(())
            }
            Some(Keyword::Distinct) => {
                self.base.flush_pending()?;
                self.distinct(offset + text.len())
            }
            Some(Keyword::Operator(op)) => self.base.add_operator(*op),
            None => self.base.add_word(text),
        }
    }

    fn quoted(&mut self, text: String, _offset: usize) -> ParseResult<()> {
        if self.alias_word(&text)? {
            return Ok(());
        }
        self.base.resolve_pending_operator(None, no_operators)?;
        self.base.add_quoted(text)
    }

    fn separator(&mut self, separator: Separator, offset: usize) -> ParseResult<()> {
        if separator == Separator::Comma {
            if self.base.depth() > 0 {
                return Err(ParseError::UnexpectedToken(",".to_string()));
            }
            return self.close_column(offset);
        }
        if !matches!(self.alias, Alias::None) {
            if separator == Separator::Space {
                return Ok(());
            }
            return Err(ParseError::UnexpectedToken(separator.as_str().to_string()));
        }
        let function = match separator {
            Separator::OpenParen => self
                .base
                .pending_word()
                .and_then(|word| functions().get(word.to_ascii_lowercase().as_str()))
                .copied(),
            _ => None,
        };
        self.base.separator(separator, no_operators, function)
    }
}
