//! # WHERE Parser
//!
//! Parses a WHERE predicate into a single [`Formula`]. On top of the base
//! grammar it understands comparisons (`=`, `<>`, `>`, `>=`), `NOT`, and four
//! keywords that read their own small sub-grammar before producing a node:
//!
//! ```text
//! column BETWEEN <number> AND <number>
//! column IN ( <literal> [, <literal>]* )
//! EXISTS ( SELECT ... )
//! <operand> IS [NOT] NULL
//! ```
//!
//! While a sub-grammar is active every token goes to it first. `<` and `<=`
//! are not operators of this dialect and fail the parse.

use std::collections::HashMap;
use std::mem;
use std::sync::OnceLock;

use vg_core::{SharedValue, Value};

use crate::config::ParserConfig;
use crate::context::VariableFactory;
use crate::error::{ParseError, ParseResult};
use crate::formula::Formula;
use crate::node::{NodeKind, Operator};
use crate::parser::{base_keywords, drive, FormulaParser, TokenSink};
use crate::tokenizer::{ScanMode, Separator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Operator(Operator),
    Between,
    In,
    Exists,
    Is,
}

static KEYWORDS: OnceLock<HashMap<&'static str, Keyword>> = OnceLock::new();

fn keywords() -> &'static HashMap<&'static str, Keyword> {
    KEYWORDS.get_or_init(|| {
        let mut map: HashMap<&'static str, Keyword> = base_keywords()
            .iter()
            .map(|(word, op)| (*word, Keyword::Operator(*op)))
            .collect();
        map.extend([
            ("=", Keyword::Operator(Operator::Equal)),
            ("<>", Keyword::Operator(Operator::NotEqual)),
            (">", Keyword::Operator(Operator::GreaterThan)),
            (">=", Keyword::Operator(Operator::GreaterOrEqual)),
            ("not", Keyword::Operator(Operator::Not)),
            ("between", Keyword::Between),
            ("in", Keyword::In),
            ("exists", Keyword::Exists),
            ("is", Keyword::Is),
        ]);
        map
    })
}

fn operator(key: &str) -> Option<Operator> {
    match keywords().get(key) {
        Some(Keyword::Operator(op)) => Some(*op),
        _ => None,
    }
}

#[derive(Debug)]
enum Between {
    Lower,
    And(SharedValue),
    Upper(SharedValue),
}

#[derive(Debug)]
enum InList {
    Open,
    Value(Vec<SharedValue>),
    Separator(Vec<SharedValue>),
}

#[derive(Debug)]
enum Exists {
    Open,
    Select,
    /// Capturing from byte `start`; `depth` counts unclosed inner parentheses.
    Capture { start: usize, depth: usize },
}

#[derive(Debug)]
enum Is {
    NotOrNull,
    Null,
}

/// Keyword sub-grammar in progress.
#[derive(Debug)]
enum Step {
    Base,
    Between(Between),
    In(InList),
    Exists(Exists),
    Is(Is),
}

impl Step {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Base => "WHERE",
            Self::Between(_) => "BETWEEN",
            Self::In(_) => "IN",
            Self::Exists(_) => "EXISTS",
            Self::Is(_) => "IS",
        }
    }
}

/// Reusable WHERE-clause parser.
pub struct WhereParser<'f> {
    base: FormulaParser<'f>,
    step: Step,
    source: String,
}

impl<'f> WhereParser<'f> {
    pub fn new(factory: &'f dyn VariableFactory) -> Self {
        Self::with_config(factory, ParserConfig::default())
    }

    pub fn with_config(factory: &'f dyn VariableFactory, config: ParserConfig) -> Self {
        Self {
            base: FormulaParser::new(factory, config),
            step: Step::Base,
            source: String::new(),
        }
    }

    /// Parse one predicate. An empty predicate yields an empty formula.
    pub fn parse(&mut self, text: &str) -> ParseResult<Formula> {
        self.base.reset();
        self.step = Step::Base;
        self.source = text.to_string();

        let max_len = self.base.config().max_statement_len;
        let result = drive(self, text, max_len).and_then(|()| self.finish());
        if result.is_err() {
            self.base.reset();
            self.step = Step::Base;
        }
        let formula = result?;
        tracing::debug!("Parsed WHERE clause into {} nodes", formula.len());
        Ok(formula)
    }

    fn finish(&mut self) -> ParseResult<Formula> {
        if !matches!(self.step, Step::Base) {
            return Err(ParseError::malformed(
                self.step.keyword(),
                "unexpected end of statement",
            ));
        }
        self.base.finish(operator)
    }

    fn keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        self.base.flush_pending()?;
        match keyword {
            Keyword::Operator(Operator::Not) => {
                // Prefix only: there must be no complete operand before it.
                if self.base.cursor_node().is_some_and(|node| !node.awaits_operand()) {
                    return Err(ParseError::UnexpectedToken("NOT".to_string()));
                }
                return self.base.add_operator(Operator::Not);
            }
            Keyword::Operator(op) => return self.base.add_operator(op),
            Keyword::Between | Keyword::In => {
                let name = if keyword == Keyword::Between {
                    "BETWEEN"
                } else {
                    "IN"
                };
                if !matches!(
                    self.base.cursor_node().map(|node| node.kind()),
                    Some(NodeKind::Variable(_))
                ) {
                    return Err(ParseError::malformed(name, "must follow a column name"));
                }
                self.step = if keyword == Keyword::Between {
                    Step::Between(Between::Lower)
                } else {
                    Step::In(InList::Open)
                };
            }
            Keyword::Exists => self.step = Step::Exists(Exists::Open),
            Keyword::Is => {
                let evaluable = self
                    .base
                    .cursor_node()
                    .is_some_and(|node| node.kind().is_terminal());
                if !evaluable {
                    return Err(ParseError::malformed("IS", "must follow an operand"));
                }
                self.step = Step::Is(Is::NotOrNull);
            }
        }
        tracing::trace!("Entered {} sub-state", self.step.keyword());
        Ok(())
    }

    /// Word while a sub-grammar is active.
    fn step_word(&mut self, word: &str, lower: &str, offset: usize) -> ParseResult<()> {
        match mem::replace(&mut self.step, Step::Base) {
            Step::Base => return Err(ParseError::UnexpectedToken(word.to_string())),
            Step::Between(Between::Lower) => {
                self.step = Step::Between(Between::And(numeric("BETWEEN", word)?));
            }
            Step::Between(Between::And(lower_bound)) => {
                if lower != "and" {
                    return Err(ParseError::malformed(
                        "BETWEEN",
                        format!("expected AND, found '{word}'"),
                    ));
                }
                self.step = Step::Between(Between::Upper(lower_bound));
            }
            Step::Between(Between::Upper(lower_bound)) => {
                let upper = numeric("BETWEEN", word)?;
                self.base.insert(NodeKind::between(lower_bound, upper)?)?;
            }
            Step::In(InList::Value(mut values)) => {
                self.push_in_value(&mut values, numeric("IN", word)?)?;
                self.step = Step::In(InList::Separator(values));
            }
            Step::In(_) => {
                return Err(ParseError::malformed("IN", format!("unexpected '{word}'")));
            }
            Step::Exists(Exists::Select) => {
                if lower != "select" {
                    return Err(ParseError::malformed(
                        "EXISTS",
                        format!("expected SELECT, found '{word}'"),
                    ));
                }
                self.step = Step::Exists(Exists::Capture {
                    start: offset,
                    depth: 0,
                });
            }
            Step::Exists(_) => {
                return Err(ParseError::malformed(
                    "EXISTS",
                    format!("expected '(', found '{word}'"),
                ));
            }
            Step::Is(Is::NotOrNull) if lower == "not" => self.step = Step::Is(Is::Null),
            Step::Is(state) => {
                if lower != "null" {
                    return Err(ParseError::malformed(
                        "IS",
                        format!("expected NULL, found '{word}'"),
                    ));
                }
                let kind = match state {
                    Is::NotOrNull => NodeKind::IsNull,
                    Is::Null => NodeKind::IsNotNull,
                };
                self.base.insert(kind)?;
            }
        }
        Ok(())
    }

    /// Separator while a sub-grammar is active.
    fn step_separator(&mut self, separator: Separator, offset: usize) -> ParseResult<()> {
        if separator == Separator::Space {
            return Ok(());
        }
        match (mem::replace(&mut self.step, Step::Base), separator) {
            (Step::In(InList::Open), Separator::OpenParen) => {
                self.step = Step::In(InList::Value(Vec::new()));
            }
            (Step::In(InList::Separator(values)), Separator::Comma) => {
                self.step = Step::In(InList::Value(values));
            }
            (Step::In(InList::Separator(values)), Separator::CloseParen) => {
                self.base.insert(NodeKind::In(values))?;
            }
            (Step::In(InList::Value(values)), Separator::CloseParen) if values.is_empty() => {
                return Err(ParseError::EmptyInList);
            }
            (Step::Exists(Exists::Open), Separator::OpenParen) => {
                self.step = Step::Exists(Exists::Select);
            }
            (Step::Exists(Exists::Capture { start, depth }), Separator::OpenParen) => {
                self.step = Step::Exists(Exists::Capture {
                    start,
                    depth: depth + 1,
                });
            }
            (Step::Exists(Exists::Capture { start, depth: 0 }), Separator::CloseParen) => {
                let statement = self.source[start..offset].trim_end().to_string();
                self.base.insert(NodeKind::Exists(statement))?;
            }
            (Step::Exists(Exists::Capture { start, depth }), Separator::CloseParen) => {
                self.step = Step::Exists(Exists::Capture {
                    start,
                    depth: depth - 1,
                });
            }
            (step, separator) => {
                return Err(ParseError::malformed(
                    step.keyword(),
                    format!("unexpected '{}'", separator.as_str()),
                ));
            }
        }
        Ok(())
    }

    fn push_in_value(&self, values: &mut Vec<SharedValue>, value: SharedValue) -> ParseResult<()> {
        let limit = self.base.config().max_in_values;
        if values.len() >= limit {
            return Err(ParseError::TooManyValues(limit));
        }
        values.push(value);
        Ok(())
    }
}

impl TokenSink for WhereParser<'_> {
    fn scan_mode(&self) -> ScanMode {
        match self.step {
            Step::Exists(Exists::Capture { .. }) => ScanMode::ParenthesesOnly,
            _ => ScanMode::Normal,
        }
    }

    fn word(&mut self, text: &str, offset: usize) -> ParseResult<()> {
        let lower = text.to_ascii_lowercase();
        if !matches!(self.step, Step::Base) {
            return self.step_word(text, &lower, offset);
        }
        let used = self.base.resolve_pending_operator(Some(text), operator)?;
        if used > 0 {
            return match &text[used..] {
                "" => Ok(()),
                rest => self.word(rest, offset + used),
            };
        }
        if let Some(keyword) = keywords().get(lower.as_str()) {
            return self.keyword(*keyword);
        }
        self.base.add_word(text)
    }

    fn quoted(&mut self, text: String, _offset: usize) -> ParseResult<()> {
        match mem::replace(&mut self.step, Step::Base) {
            Step::Base => {
                self.base.resolve_pending_operator(None, operator)?;
                self.base.add_quoted(text)
            }
            Step::In(InList::Value(mut values)) => {
                self.push_in_value(&mut values, Value::string(text).into_shared())?;
                self.step = Step::In(InList::Separator(values));
                Ok(())
            }
            step => Err(ParseError::malformed(
                step.keyword(),
                "unexpected quoted literal",
            )),
        }
    }

    fn separator(&mut self, separator: Separator, offset: usize) -> ParseResult<()> {
        if !matches!(self.step, Step::Base) {
            return self.step_separator(separator, offset);
        }
        self.base.separator(separator, operator, None)
    }
}

fn numeric(keyword: &'static str, word: &str) -> ParseResult<SharedValue> {
    Value::from_numeric_literal(word)
        .map(Value::into_shared)
        .ok_or_else(|| ParseError::malformed(keyword, format!("'{word}' is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ColumnMap, NamedVariables, RowContext};
    use crate::error::EvalError;
    use std::collections::HashMap;
    use vg_core::Row;

    fn parse(text: &str) -> ParseResult<Formula> {
        WhereParser::new(&NamedVariables).parse(text)
    }

    fn ctx(pairs: &[(&str, Value)]) -> HashMap<String, SharedValue> {
        pairs
            .iter()
            .map(|(name, v)| (name.to_string(), v.clone().into_shared()))
            .collect()
    }

    #[test]
    fn test_and_chain_nests_right() {
        let formula = parse("a = 1 AND b = 'x' AND c = -5").unwrap();
        assert_eq!(
            formula.to_string(),
            "(a = 1) AND ((b = 'x') AND (c = -5))"
        );
        let root = formula.root_node().unwrap();
        assert!(matches!(root.kind(), NodeKind::Operator(Operator::And)));
        let left = formula.node(root.left().unwrap()).unwrap();
        assert!(matches!(left.kind(), NodeKind::Operator(Operator::Equal)));
        let right = formula.node(root.right().unwrap()).unwrap();
        assert!(matches!(right.kind(), NodeKind::Operator(Operator::And)));
    }

    #[test]
    fn test_parenthesized_or_under_and() {
        let formula = parse("(a = 1 OR b = 2) AND c = 3").unwrap();
        assert_eq!(formula.to_string(), "((a = 1) OR (b = 2)) AND (c = 3)");
        let root = formula.root_node().unwrap();
        assert!(matches!(root.kind(), NodeKind::Operator(Operator::And)));
        let group = formula.node(root.left().unwrap()).unwrap();
        assert!(matches!(group.kind(), NodeKind::Parenthesis));
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(parse("a >= 1").unwrap().to_string(), "a >= 1");
        assert_eq!(parse("a>1").unwrap().to_string(), "a > 1");
        assert_eq!(parse("a <> 'b'").unwrap().to_string(), "a <> 'b'");
        assert_eq!(parse("a<>1").unwrap().to_string(), "a <> 1");
        let formula = parse("price >= 100.0").unwrap();
        assert_eq!(formula.to_string(), "price >= 100.0");
        assert_eq!(parse(&formula.to_string()).unwrap().to_string(), "price >= 100.0");
    }

    #[test]
    fn test_less_than_is_not_supported() {
        assert_eq!(
            parse("a < 1"),
            Err(ParseError::UnknownOperator("<".to_string()))
        );
        assert_eq!(
            parse("a <= 1"),
            Err(ParseError::UnknownOperator("<=".to_string()))
        );
        for text in ["a<=1", "a <=1"] {
            assert_eq!(
                parse(text),
                Err(ParseError::UnknownOperator("<=".to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_greater_or_equal_glued_to_operand() {
        for text in ["a>=1", "a >=1", "a>= 1", "a >= 1"] {
            let mut formula = parse(text).unwrap();
            assert_eq!(formula.to_string(), "a >= 1", "{text}");
            assert!(formula.matches(&ctx(&[("a", Value::int32(5))])).unwrap());
            assert!(formula.matches(&ctx(&[("a", Value::int32(1))])).unwrap());
            assert!(!formula.matches(&ctx(&[("a", Value::int32(0))])).unwrap());
        }

        let columns = ColumnMap::new(["a", "b"]);
        let mut formula = WhereParser::new(&columns).parse("a>=1 AND b>=a").unwrap();
        assert_eq!(formula.to_string(), "(a >= 1) AND (b >= a)");
        let row = Row::from_values([Value::int32(5), Value::int32(7)]);
        assert!(formula.matches(&RowContext::new(&row)).unwrap());
    }

    #[test]
    fn test_not_negates_only_false() {
        let mut formula = parse("NOT a = 1").unwrap();
        assert_eq!(formula.to_string(), "NOT (a = 1)");
        assert!(formula.matches(&ctx(&[("a", Value::int32(2))])).unwrap());
        assert!(!formula.matches(&ctx(&[("a", Value::int32(1))])).unwrap());
        // NOT of an absent operand is false
        assert!(!formula.matches(&ctx(&[])).unwrap());
    }

    #[test]
    fn test_not_of_non_boolean_is_false() {
        let mut formula = parse("NOT qty").unwrap();
        assert_eq!(formula.to_string(), "NOT qty");
        for v in [
            Value::int32(0),
            Value::int32(7),
            Value::uint64(0),
            Value::string(""),
            Value::null_of(vg_core::ScalarKind::Bool),
        ] {
            assert!(!formula.matches(&ctx(&[("qty", v.clone())])).unwrap(), "{v:?}");
        }
        assert!(formula.matches(&ctx(&[("qty", Value::bool(false))])).unwrap());

        let columns = ColumnMap::new(["qty"]);
        let mut formula = WhereParser::new(&columns).parse("NOT qty").unwrap();
        let row = Row::from_values([Value::int32(0)]);
        assert!(!formula.matches(&RowContext::new(&row)).unwrap());
    }

    #[test]
    fn test_not_is_prefix_only() {
        assert_eq!(
            parse("a = 1 NOT"),
            Err(ParseError::UnexpectedToken("NOT".to_string()))
        );
        assert_eq!(
            parse("(a = 1) not"),
            Err(ParseError::UnexpectedToken("NOT".to_string()))
        );
        assert_eq!(
            parse("a NOT"),
            Err(ParseError::UnexpectedToken("NOT".to_string()))
        );
        assert_eq!(
            parse("a = 1 AND NOT b = 2").unwrap().to_string(),
            "(a = 1) AND (NOT (b = 2))"
        );
        assert_eq!(parse("(NOT a)").unwrap().to_string(), "(NOT a)");
    }

    #[test]
    fn test_between_is_inclusive() {
        let mut formula = parse("price BETWEEN 10 AND 20").unwrap();
        assert_eq!(formula.to_string(), "price BETWEEN 10 AND 20");
        for (price, expected) in [(9, false), (10, true), (15, true), (20, true), (21, false)] {
            let row = ctx(&[("price", Value::int32(price))]);
            assert_eq!(formula.matches(&row).unwrap(), expected, "price {price}");
        }
    }

    #[test]
    fn test_between_combines_with_and() {
        let formula = parse("price between 1 and 5 and qty > 0").unwrap();
        assert_eq!(
            formula.to_string(),
            "(price BETWEEN 1 AND 5) AND (qty > 0)"
        );
    }

    #[test]
    fn test_between_errors() {
        assert!(matches!(
            parse("1 BETWEEN 1 AND 2"),
            Err(ParseError::Malformed { keyword: "BETWEEN", .. })
        ));
        assert!(matches!(
            parse("a BETWEEN 5 AND 3"),
            Err(ParseError::Malformed { keyword: "BETWEEN", .. })
        ));
        assert!(matches!(
            parse("a BETWEEN x AND 3"),
            Err(ParseError::Malformed { keyword: "BETWEEN", .. })
        ));
        assert!(matches!(
            parse("a BETWEEN 1 OR 3"),
            Err(ParseError::Malformed { keyword: "BETWEEN", .. })
        ));
        assert!(matches!(
            parse("a BETWEEN 1"),
            Err(ParseError::Malformed { keyword: "BETWEEN", .. })
        ));
    }

    #[test]
    fn test_in_list() {
        let mut formula = parse("name IN ('Alice', 'Bob')").unwrap();
        assert_eq!(formula.to_string(), "name IN ('Alice', 'Bob')");
        assert!(formula
            .matches(&ctx(&[("name", Value::string("Bob"))]))
            .unwrap());
        assert!(!formula
            .matches(&ctx(&[("name", Value::string("Carol"))]))
            .unwrap());

        let formula = parse("id in (1,2 , 3)").unwrap();
        assert_eq!(formula.to_string(), "id IN (1, 2, 3)");
    }

    #[test]
    fn test_in_list_errors() {
        assert_eq!(parse("a IN ()"), Err(ParseError::EmptyInList));
        assert!(matches!(
            parse("a IN (1,)"),
            Err(ParseError::Malformed { keyword: "IN", .. })
        ));
        assert!(matches!(
            parse("a IN (b)"),
            Err(ParseError::Malformed { keyword: "IN", .. })
        ));
        assert!(matches!(
            parse("a IN 1"),
            Err(ParseError::Malformed { keyword: "IN", .. })
        ));

        let config = ParserConfig {
            max_in_values: 2,
            ..ParserConfig::default()
        };
        assert_eq!(
            WhereParser::with_config(&NamedVariables, config).parse("a IN (1, 2, 3)"),
            Err(ParseError::TooManyValues(2))
        );
    }

    #[test]
    fn test_long_and_chain_is_bounded() {
        let chain = |terms: usize| vec!["a = 1"; terms].join(" AND ");
        let limit = ParserConfig::default().max_tree_depth;

        // n comparisons joined by AND nest n + 1 levels deep
        let mut formula = parse(&chain(limit - 1)).unwrap();
        assert_eq!(formula.height(), limit);
        assert!(formula.matches(&ctx(&[("a", Value::int32(1))])).unwrap());
        assert!(!formula.matches(&ctx(&[("a", Value::int32(2))])).unwrap());

        assert_eq!(parse(&chain(limit)), Err(ParseError::TooDeep(limit)));
        assert_eq!(parse(&chain(2_000)), Err(ParseError::TooDeep(limit)));

        // the parser stays usable after rejecting a deep chain
        let mut parser = WhereParser::new(&NamedVariables);
        assert!(parser.parse(&chain(2_000)).is_err());
        assert_eq!(parser.parse("a = 1").unwrap().to_string(), "a = 1");
    }

    #[test]
    fn test_exists_captures_statement() {
        let formula =
            parse("EXISTS (select id from t where name = ')' and (x > 1)) AND a = 1").unwrap();
        assert_eq!(
            formula.to_string(),
            "EXISTS (select id from t where name = ')' and (x > 1)) AND (a = 1)"
        );
        let root = formula.root_node().unwrap();
        let exists = formula.node(root.left().unwrap()).unwrap();
        match exists.kind() {
            NodeKind::Exists(statement) => {
                assert_eq!(statement, "select id from t where name = ')' and (x > 1)")
            }
            other => panic!("expected EXISTS, got {other:?}"),
        }
    }

    #[test]
    fn test_exists_evaluates_through_context() {
        let columns = ColumnMap::new(["a"]);
        let mut formula = WhereParser::new(&columns)
            .parse("exists (select 1) and a = 1")
            .unwrap();
        let row = Row::from_values([Value::int32(1)]);
        let yes = |_: &str| -> Result<bool, String> { Ok(true) };
        let no = |_: &str| -> Result<bool, String> { Ok(false) };
        assert!(formula
            .matches(&RowContext::new(&row).with_exists(&yes))
            .unwrap());
        assert!(!formula
            .matches(&RowContext::new(&row).with_exists(&no))
            .unwrap());
        assert_eq!(
            formula.matches(&RowContext::new(&row)),
            Err(EvalError::ExistsUnsupported)
        );
        let broken = |_: &str| -> Result<bool, String> { Err("table t is gone".to_string()) };
        assert_eq!(
            formula.matches(&RowContext::new(&row).with_exists(&broken)),
            Err(EvalError::Exists("table t is gone".to_string()))
        );
    }

    #[test]
    fn test_exists_errors() {
        assert!(matches!(
            parse("EXISTS select 1"),
            Err(ParseError::Malformed { keyword: "EXISTS", .. })
        ));
        assert!(matches!(
            parse("EXISTS (update t)"),
            Err(ParseError::Malformed { keyword: "EXISTS", .. })
        ));
        assert!(matches!(
            parse("EXISTS (select (1)"),
            Err(ParseError::Malformed { keyword: "EXISTS", .. })
        ));
    }

    #[test]
    fn test_is_null() {
        let mut formula = parse("a IS NULL").unwrap();
        assert_eq!(formula.to_string(), "a IS NULL");
        let null = ctx(&[("a", Value::null_of(vg_core::ScalarKind::String))]);
        assert!(formula.matches(&null).unwrap());
        assert_eq!(formula.evaluate(&ctx(&[])).unwrap(), None);

        let mut formula = parse("a is not null or b = 1").unwrap();
        assert_eq!(formula.to_string(), "(a IS NOT NULL) OR (b = 1)");
        assert!(formula.matches(&ctx(&[("a", Value::int32(0))])).unwrap());
    }

    #[test]
    fn test_is_errors() {
        assert!(matches!(
            parse("IS NULL"),
            Err(ParseError::Malformed { keyword: "IS", .. })
        ));
        assert!(matches!(
            parse("a IS 1"),
            Err(ParseError::Malformed { keyword: "IS", .. })
        ));
        assert!(matches!(
            parse("a IS NOT"),
            Err(ParseError::Malformed { keyword: "IS", .. })
        ));
    }

    #[test]
    fn test_unknown_column_fails_parse() {
        let columns = ColumnMap::new(["a"]);
        assert_eq!(
            WhereParser::new(&columns).parse("b = 1"),
            Err(ParseError::UnknownVariable("b".to_string()))
        );
    }

    #[test]
    fn test_parser_is_reusable_after_error() {
        let mut parser = WhereParser::new(&NamedVariables);
        assert!(parser.parse("a IN (").is_err());
        assert_eq!(parser.parse("a = 1").unwrap().to_string(), "a = 1");
    }

    #[test]
    fn test_empty_where_is_empty_formula() {
        assert!(parse("").unwrap().is_empty());
    }
}
