//! # Formula Parser
//!
//! Shared machinery of the statement parsers. A [`TokenSink`] receives the
//! tokens of a statement from [`drive`]; the column-list and WHERE parsers
//! are sinks that wrap a [`FormulaParser`] and add their own keywords.
//!
//! Token handling, in order:
//!
//! 1. A pending operator fragment (`<` or `>`) is first tried together with
//!    the next word, so `>` followed by `=` becomes `>=`.
//! 2. A keyword flushes the pending word and runs its handler.
//! 3. Inside a function call, a word becomes the next argument.
//! 4. Otherwise the word is held as pending until the next operator,
//!    separator or keyword decides what it is. Two pending words in a row
//!    are an error.
//!
//! Whitespace never flushes a pending word.

use std::collections::HashMap;
use std::sync::OnceLock;

use vg_core::Value;

use crate::config::ParserConfig;
use crate::context::VariableFactory;
use crate::error::{ParseError, ParseResult};
use crate::formula::Formula;
use crate::node::{Aggregate, AggregateFunction, Node, NodeId, NodeKind, Operator};
use crate::tokenizer::{ScanMode, Scanner, Separator, Token};

/// Receives the tokens of one statement.
pub(crate) trait TokenSink {
    fn scan_mode(&self) -> ScanMode;
    fn word(&mut self, text: &str, offset: usize) -> ParseResult<()>;
    fn quoted(&mut self, text: String, offset: usize) -> ParseResult<()>;
    fn separator(&mut self, separator: Separator, offset: usize) -> ParseResult<()>;
}

/// Feed every token of `text` to `sink`.
pub(crate) fn drive<S: TokenSink>(sink: &mut S, text: &str, max_len: usize) -> ParseResult<()> {
    if text.len() > max_len {
        return Err(ParseError::TooLong {
            len: text.len(),
            limit: max_len,
        });
    }
    let mut scanner = Scanner::new(text);
    while let Some(token) = scanner.next_token(sink.scan_mode())? {
        match token {
            Token::Word { text, offset } => sink.word(text, offset)?,
            Token::Quoted { text, offset } => sink.quoted(text, offset)?,
            Token::Separator { separator, offset } => sink.separator(separator, offset)?,
        }
    }
    Ok(())
}

// =============================================================================
// Keyword tables
// =============================================================================

static BASE_KEYWORDS: OnceLock<HashMap<&'static str, Operator>> = OnceLock::new();

/// Keywords understood by every statement parser.
pub(crate) fn base_keywords() -> &'static HashMap<&'static str, Operator> {
    BASE_KEYWORDS.get_or_init(|| HashMap::from([("and", Operator::And), ("or", Operator::Or)]))
}

/// Resolves an operator spelled by a pending fragment, optionally completed
/// by the word that followed it.
pub(crate) type OperatorLookup = fn(&str) -> Option<Operator>;

/// Lookup for parsers that accept no comparison operators.
pub(crate) fn no_operators(_: &str) -> Option<Operator> {
    None
}

// =============================================================================
// FormulaParser
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Context {
    Parenthesis(NodeId),
    Function(NodeId),
}

impl Context {
    fn node(&self) -> NodeId {
        match self {
            Self::Parenthesis(id) | Self::Function(id) => *id,
        }
    }
}

/// Builds one formula from a stream of words, operators and parentheses.
pub(crate) struct FormulaParser<'f> {
    factory: &'f dyn VariableFactory,
    config: ParserConfig,
    formula: Formula,
    /// Most recently inserted node.
    cursor: Option<NodeId>,
    pending_word: Option<String>,
    pending_operator: Option<&'static str>,
    contexts: Vec<Context>,
}

impl<'f> FormulaParser<'f> {
    pub(crate) fn new(factory: &'f dyn VariableFactory, config: ParserConfig) -> Self {
        Self {
            factory,
            config,
            formula: Formula::new(),
            cursor: None,
            pending_word: None,
            pending_operator: None,
            contexts: Vec::new(),
        }
    }

    pub(crate) fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn reset(&mut self) {
        self.formula = Formula::new();
        self.cursor = None;
        self.pending_word = None;
        self.pending_operator = None;
        self.contexts.clear();
    }

    pub(crate) fn cursor_node(&self) -> Option<&Node> {
        self.formula.node(self.cursor?)
    }

    pub(crate) fn pending_word(&self) -> Option<&str> {
        self.pending_word.as_deref()
    }

    /// True while no token has contributed to the formula yet.
    pub(crate) fn is_untouched(&self) -> bool {
        self.formula.len() == 0 && self.pending_word.is_none() && self.pending_operator.is_none()
    }

    pub(crate) fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// The function call currently collecting arguments.
    pub(crate) fn open_function(&self) -> Option<NodeId> {
        match self.contexts.last() {
            Some(Context::Function(id)) if self.cursor == Some(*id) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn function_mut(&mut self, id: NodeId) -> Option<&mut Aggregate> {
        match self.formula.kind_mut(id) {
            Some(NodeKind::Function(aggregate)) => Some(aggregate),
            _ => None,
        }
    }

    /// Literal for a numeric word, otherwise a variable from the factory.
    fn terminal(&self, word: &str) -> ParseResult<NodeKind> {
        match Value::from_numeric_literal(word) {
            Some(v) => Ok(NodeKind::Value(v.into_shared())),
            None => Ok(NodeKind::Variable(self.factory.create(word)?)),
        }
    }

    /// Handle a word that is not a keyword.
    pub(crate) fn add_word(&mut self, word: &str) -> ParseResult<()> {
        if let Some(function) = self.open_function() {
            let kind = self.terminal(word)?;
            self.formula.push_argument(function, kind)?;
            return Ok(());
        }
        if self.pending_word.is_some() {
            return Err(ParseError::UnexpectedToken(word.to_string()));
        }
        self.pending_word = Some(word.to_string());
        Ok(())
    }

    pub(crate) fn add_quoted(&mut self, text: String) -> ParseResult<()> {
        let kind = NodeKind::Value(Value::string(text).into_shared());
        if let Some(function) = self.open_function() {
            self.formula.push_argument(function, kind)?;
            return Ok(());
        }
        self.flush_pending()?;
        self.insert(kind)?;
        Ok(())
    }

    /// Turn the pending word into a terminal node.
    pub(crate) fn flush_pending(&mut self) -> ParseResult<()> {
        if let Some(word) = self.pending_word.take() {
            let kind = self.terminal(&word)?;
            self.insert(kind)?;
        }
        Ok(())
    }

    /// Insert a node by rank and make it the cursor.
    pub(crate) fn insert(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        let id = self.formula.push(kind);
        let limit = self.contexts.last().map(Context::node);
        self.formula.insert(id, self.cursor, limit)?;
        self.cursor = Some(id);
        Ok(id)
    }

    pub(crate) fn add_operator(&mut self, op: Operator) -> ParseResult<()> {
        self.flush_pending()?;
        self.insert(NodeKind::Operator(op))?;
        Ok(())
    }

    /// Open a group, or a call of `function` named by the pending word.
    pub(crate) fn open_parenthesis(&mut self, function: Option<AggregateFunction>) -> ParseResult<()> {
        if self.contexts.len() >= self.config.max_nesting_depth {
            return Err(ParseError::TooDeep(self.config.max_nesting_depth));
        }
        let context = match function {
            Some(function) => {
                self.pending_word = None;
                Context::Function(self.insert(NodeKind::Function(Aggregate::new(function)))?)
            }
            None => {
                self.flush_pending()?;
                Context::Parenthesis(self.insert(NodeKind::Parenthesis)?)
            }
        };
        self.contexts.push(context);
        Ok(())
    }

    pub(crate) fn close_parenthesis(&mut self) -> ParseResult<()> {
        self.flush_pending()?;
        let context = self
            .contexts
            .pop()
            .ok_or(ParseError::UnbalancedParenthesis)?;
        let id = context.node();
        if let Some(NodeKind::Function(aggregate)) = self.formula.node(id).map(Node::kind) {
            aggregate.check_arity()?;
        }
        self.cursor = Some(id);
        Ok(())
    }

    /// Resolve the pending operator fragment, if any. With `next` given, a
    /// leading `=` of that word completes the fragment, so `a>=1` reads as
    /// `a >= 1`. Returns how many bytes of `next` were consumed.
    pub(crate) fn resolve_pending_operator(
        &mut self,
        next: Option<&str>,
        lookup: OperatorLookup,
    ) -> ParseResult<usize> {
        let Some(fragment) = self.pending_operator.take() else {
            return Ok(0);
        };
        if next.is_some_and(|word| word.starts_with('=')) {
            let combined = format!("{fragment}=");
            let op = lookup(&combined).ok_or(ParseError::UnknownOperator(combined))?;
            self.add_operator(op)?;
            return Ok(1);
        }
        let op = lookup(fragment).ok_or_else(|| ParseError::UnknownOperator(fragment.to_string()))?;
        self.add_operator(op)?;
        Ok(0)
    }

    /// Default handling of a separator outside any keyword sub-state.
    pub(crate) fn separator(
        &mut self,
        separator: Separator,
        lookup: OperatorLookup,
        function: Option<AggregateFunction>,
    ) -> ParseResult<()> {
        if separator == Separator::Greater && self.pending_operator == Some("<") {
            self.pending_operator = None;
            let op = lookup("<>").ok_or_else(|| ParseError::UnknownOperator("<>".to_string()))?;
            return self.add_operator(op);
        }
        self.resolve_pending_operator(None, lookup)?;
        match separator {
            Separator::Space => Ok(()),
            Separator::Less | Separator::Greater => {
                self.pending_operator = Some(separator.as_str());
                Ok(())
            }
            Separator::OpenParen => self.open_parenthesis(function),
            Separator::CloseParen => self.close_parenthesis(),
            Separator::Plus => self.add_operator(Operator::Plus),
            Separator::Slash => self.add_operator(Operator::Div),
            Separator::Comma => Err(ParseError::UnexpectedToken(",".to_string())),
        }
    }

    /// Complete the formula and reset for the next statement.
    pub(crate) fn finish(&mut self, lookup: OperatorLookup) -> ParseResult<Formula> {
        self.resolve_pending_operator(None, lookup)?;
        self.flush_pending()?;
        if !self.contexts.is_empty() {
            return Err(ParseError::UnbalancedParenthesis);
        }
        self.formula.check_complete()?;
        let height = self.formula.height();
        if height > self.config.max_tree_depth {
            tracing::debug!(
                "Rejected formula of height {} (limit {})",
                height,
                self.config.max_tree_depth
            );
            return Err(ParseError::TooDeep(self.config.max_tree_depth));
        }
        let formula = std::mem::take(&mut self.formula);
        self.reset();
        Ok(formula)
    }
}
