//! # Formula Nodes
//!
//! Node kinds of a formula tree, their binding ranks and the running state
//! of aggregate functions.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use vg_core::{Comparison, DatumKey, SharedValue, Value};

use crate::context::Variable;
use crate::error::{EvalResult, ParseError, ParseResult};

/// Index of a node inside its [`Formula`](crate::Formula).
pub type NodeId = usize;

/// Binding rank used by precedence insertion. Lower binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Terminal = 0,
    Div = 2,
    Plus = 3,
    Compare = 5,
    Not = 6,
    And = 7,
    Or = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    Plus,
    Div,
    Not,
    And,
    Or,
}

impl Operator {
    pub fn priority(&self) -> Priority {
        match self {
            Self::Div => Priority::Div,
            Self::Plus => Priority::Plus,
            Self::Equal | Self::NotEqual | Self::GreaterThan | Self::GreaterOrEqual => {
                Priority::Compare
            }
            Self::Not => Priority::Not,
            Self::And => Priority::And,
            Self::Or => Priority::Or,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::Plus => "+",
            Self::Div => "/",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub fn is_unary(&self) -> bool {
        *self == Self::Not
    }

    /// Value comparison performed by a comparator.
    pub fn comparison(&self) -> Option<Comparison> {
        match self {
            Self::Equal => Some(Comparison::Eq),
            Self::NotEqual => Some(Comparison::Ne),
            Self::GreaterThan => Some(Comparison::Gt),
            Self::GreaterOrEqual => Some(Comparison::Ge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Max,
    Count,
    Sum,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Max => "MAX",
            Self::Count => "COUNT",
            Self::Sum => "SUM",
        }
    }

    pub fn arity(&self) -> usize {
        1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct AggregateState {
    max: Option<SharedValue>,
    sum: Option<Value>,
    count: u64,
    seen: HashSet<DatumKey>,
}

/// An aggregate call together with what it has accumulated so far.
///
/// Null and absent arguments are skipped by `MAX`, `SUM` and
/// `COUNT(DISTINCT ...)`. A plain `COUNT` counts every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    function: AggregateFunction,
    distinct: bool,
    args: Vec<NodeId>,
    state: AggregateState,
}

impl Aggregate {
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            distinct: false,
            args: Vec::new(),
            state: AggregateState::default(),
        }
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn args(&self) -> &[NodeId] {
        &self.args
    }

    pub(crate) fn set_distinct(&mut self) {
        self.distinct = true;
    }

    pub(crate) fn push_arg(&mut self, arg: NodeId) {
        self.args.push(arg);
    }

    pub(crate) fn check_arity(&self) -> ParseResult<()> {
        let expected = self.function.arity();
        if self.args.len() != expected {
            return Err(ParseError::Arity {
                function: self.function.name(),
                expected,
                got: self.args.len(),
            });
        }
        Ok(())
    }

    /// Fold one evaluation of the argument into the running state.
    pub(crate) fn accumulate(&mut self, arg: Option<SharedValue>) -> EvalResult<()> {
        let present = arg.filter(|v| !v.is_null());
        match self.function {
            AggregateFunction::Count if !self.distinct => self.state.count += 1,
            AggregateFunction::Count => {
                if let Some(v) = present {
                    self.state.seen.insert(v.key());
                }
            }
            AggregateFunction::Max => {
                if let Some(v) = present {
                    let greater = match &self.state.max {
                        Some(current) => v.gt(current)?,
                        None => true,
                    };
                    if greater {
                        self.state.max = Some(v);
                    }
                }
            }
            AggregateFunction::Sum => {
                if let Some(v) = present {
                    match self.state.sum.as_mut() {
                        Some(total) => total.add_assign(&v)?,
                        None => self.state.sum = Some(Value::clone(&v)),
                    }
                }
            }
        }
        Ok(())
    }

    /// Result so far. `MAX` and `SUM` have none until a value arrives;
    /// counts are `UInt64`.
    pub fn current(&self) -> Option<SharedValue> {
        match self.function {
            AggregateFunction::Max => self.state.max.clone(),
            AggregateFunction::Sum => self.state.sum.clone().map(Arc::new),
            AggregateFunction::Count if self.distinct => {
                Some(Value::uint64(self.state.seen.len() as u64).into_shared())
            }
            AggregateFunction::Count => Some(Value::uint64(self.state.count).into_shared()),
        }
    }

    pub fn reset_statistics(&mut self) {
        self.state = AggregateState::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Value(SharedValue),
    Variable(Variable),
    /// Grouping; its content hangs on the left.
    Parenthesis,
    Operator(Operator),
    /// Inclusive range test on the left operand.
    Between {
        lower: SharedValue,
        upper: SharedValue,
    },
    /// Membership test on the left operand.
    In(Vec<SharedValue>),
    /// Deferred sub-query, run through the evaluation context.
    Exists(String),
    IsNull,
    IsNotNull,
    Function(Aggregate),
}

impl NodeKind {
    /// A `BETWEEN` node. The lower bound must sort strictly below the upper.
    pub fn between(lower: SharedValue, upper: SharedValue) -> ParseResult<Self> {
        if !lower.lt(&upper)? {
            return Err(ParseError::malformed(
                "BETWEEN",
                format!("lower bound {lower} is not below upper bound {upper}"),
            ));
        }
        Ok(Self::Between { lower, upper })
    }

    pub fn priority(&self) -> Priority {
        match self {
            Self::Operator(op) => op.priority(),
            Self::Between { .. } | Self::In(_) | Self::IsNull | Self::IsNotNull => {
                Priority::Compare
            }
            Self::Value(_)
            | Self::Variable(_)
            | Self::Parenthesis
            | Self::Exists(_)
            | Self::Function(_) => Priority::Terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.priority() == Priority::Terminal
    }

    pub fn takes_left(&self) -> bool {
        matches!(
            self,
            Self::Parenthesis
                | Self::Operator(_)
                | Self::Between { .. }
                | Self::In(_)
                | Self::IsNull
                | Self::IsNotNull
        )
    }

    pub fn takes_right(&self) -> bool {
        matches!(self, Self::Operator(op) if !op.is_unary())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Variable(_) => "column",
            Self::Parenthesis => "parenthesis",
            Self::Operator(op) => op.symbol(),
            Self::Between { .. } => "BETWEEN",
            Self::In(_) => "IN",
            Self::Exists(_) => "EXISTS",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Function(aggregate) => aggregate.function().name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            left: None,
            right: None,
            parent: None,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// True while an operand slot this node requires is still empty.
    pub fn awaits_operand(&self) -> bool {
        (self.kind.takes_left() && self.left.is_none())
            || (self.kind.takes_right() && self.right.is_none())
    }
}

/// Writes a value the way it would appear in a statement.
pub(crate) struct Literal<'a>(pub &'a Value);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.datum() {
            vg_core::Datum::String(s) if !self.0.is_null() => {
                write!(f, "'{}'", s.replace('\'', "''"))
            }
            // Keep the fraction so the literal reads back as a Double.
            vg_core::Datum::Double(v) if !self.0.is_null() && v.fract() == 0.0 => {
                write!(f, "{v:.1}")
            }
            _ => write!(f, "{}", self.0),
        }
    }
}
