//! # Formula Trees
//!
//! A formula is an arena of [`Node`]s addressed by [`NodeId`]. Each node
//! records its parent and its two operand slots; aggregate calls keep their
//! arguments in a separate list.
//!
//! Trees are built by the statement parsers through [`Formula::insert`],
//! which places each new node by binding rank. Evaluation walks the tree
//! bottom-up against an [`EvalContext`]. Both operands of every binary node
//! are always evaluated; `AND` and `OR` do not short-circuit.
//!
//! # Invariants
//!
//! - Every node except the root is referenced from exactly one parent slot
//!   or argument list, and its `parent` points back there.
//! - A formula returned by a parser has no node awaiting an operand, and
//!   its [`Formula::height`] is within the parser's `max_tree_depth`.

use std::fmt;
use std::sync::Arc;

use vg_core::{Comparison, SharedValue, Value};

use crate::context::EvalContext;
use crate::error::{EvalResult, ParseError, ParseResult};
use crate::node::{Literal, Node, NodeId, NodeKind, Operator, Priority};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Formula {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.node(self.root?)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    pub fn has_aggregate(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node.kind, NodeKind::Function(_)))
    }

    /// Levels on the longest path from the root, aggregate arguments
    /// included. An empty formula has height 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((id, level)) = stack.pop() {
            height = height.max(level);
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            stack.extend(node.left.into_iter().chain(node.right).map(|child| (child, level + 1)));
            if let NodeKind::Function(aggregate) = &node.kind {
                stack.extend(aggregate.args().iter().map(|arg| (*arg, level + 1)));
            }
        }
        height
    }

    /// Forget everything the aggregates have accumulated.
    pub fn reset_statistics(&mut self) {
        for node in &mut self.nodes {
            if let NodeKind::Function(aggregate) = &mut node.kind {
                aggregate.reset_statistics();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Add a detached node.
    pub(crate) fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        self.nodes.len() - 1
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(id).map(|node| &mut node.kind)
    }

    /// Add `kind` as the next argument of the aggregate at `function`.
    pub(crate) fn push_argument(&mut self, function: NodeId, kind: NodeKind) -> ParseResult<NodeId> {
        let id = self.push(kind);
        match &mut self.nodes[function].kind {
            NodeKind::Function(aggregate) => aggregate.push_arg(id),
            other => return Err(ParseError::Misplaced(other.name())),
        }
        self.nodes[id].parent = Some(function);
        Ok(id)
    }

    /// Place the detached node `id` relative to `cursor`, the most recently
    /// inserted node. The upward walk for an operator never passes `limit`,
    /// the innermost open parenthesis or function call.
    ///
    /// A terminal, or any node arriving while the cursor still awaits an
    /// operand, becomes a child of the cursor. An operator otherwise climbs
    /// from the cursor through ancestors ranked no looser than itself and
    /// takes the highest of them as its left operand. On reaching an
    /// ancestor of equal rank it stops and takes that ancestor's right
    /// operand instead, so equal-rank chains nest to the right.
    pub(crate) fn insert(
        &mut self,
        id: NodeId,
        cursor: Option<NodeId>,
        limit: Option<NodeId>,
    ) -> ParseResult<()> {
        let Some(cursor) = cursor else {
            if self.root.is_some() {
                return Err(ParseError::Misplaced(self.nodes[id].kind.name()));
            }
            self.root = Some(id);
            return Ok(());
        };

        let priority = self.nodes[id].kind.priority();
        if priority == Priority::Terminal || self.nodes[cursor].awaits_operand() {
            return self.attach(cursor, id);
        }
        let Some(mut target) = self.find_insert_point(cursor, priority, limit) else {
            return self.attach(cursor, id);
        };
        if self.nodes[target].kind.priority() == priority {
            target = self.nodes[target]
                .right
                .ok_or(ParseError::Misplaced(self.nodes[id].kind.name()))?;
        }
        self.splice(id, target);
        tracing::trace!(
            "Inserted {} above {}",
            self.nodes[id].kind.name(),
            self.nodes[target].kind.name()
        );
        Ok(())
    }

    fn find_insert_point(
        &self,
        cursor: NodeId,
        priority: Priority,
        limit: Option<NodeId>,
    ) -> Option<NodeId> {
        let mut target = None;
        let mut current = Some(cursor);
        while let Some(id) = current {
            if Some(id) == limit {
                break;
            }
            let rank = self.nodes[id].kind.priority();
            if rank > priority {
                break;
            }
            target = Some(id);
            if rank == priority {
                break;
            }
            current = self.nodes[id].parent;
        }
        target
    }

    /// Put `child` into the first free operand slot of `parent`.
    fn attach(&mut self, parent: NodeId, child: NodeId) -> ParseResult<()> {
        let node = &mut self.nodes[parent];
        if node.kind.takes_left() && node.left.is_none() {
            node.left = Some(child);
        } else if node.kind.takes_right() && node.right.is_none() {
            node.right = Some(child);
        } else {
            return Err(ParseError::Misplaced(self.nodes[child].kind.name()));
        }
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Replace `target` with the fresh node `id` and hang `target` on its left.
    fn splice(&mut self, id: NodeId, target: NodeId) {
        let parent = self.nodes[target].parent;
        match parent {
            Some(p) if self.nodes[p].left == Some(target) => self.nodes[p].left = Some(id),
            Some(p) => self.nodes[p].right = Some(id),
            None => self.root = Some(id),
        }
        self.nodes[id].parent = parent;
        self.nodes[id].left = Some(target);
        self.nodes[target].parent = Some(id);
    }

    /// Fail on the first node still missing an operand.
    pub(crate) fn check_complete(&self) -> ParseResult<()> {
        match self.nodes.iter().find(|node| node.awaits_operand()) {
            Some(node) => Err(ParseError::Incomplete(node.kind.name())),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// Evaluate against `ctx`. `Ok(None)` means the result is absent, for
    /// instance because a variable had no value. Aggregates fold in the
    /// values seen on this call.
    pub fn evaluate(&mut self, ctx: &dyn EvalContext) -> EvalResult<Option<SharedValue>> {
        match self.root {
            Some(root) => self.eval(root, ctx),
            None => Ok(None),
        }
    }

    /// Evaluate as a predicate: only a canonical `true` matches.
    pub fn matches(&mut self, ctx: &dyn EvalContext) -> EvalResult<bool> {
        Ok(self.evaluate(ctx)?.is_some_and(|v| v.is_true()))
    }

    fn eval(&mut self, id: NodeId, ctx: &dyn EvalContext) -> EvalResult<Option<SharedValue>> {
        if let NodeKind::Function(aggregate) = &self.nodes[id].kind {
            let args = aggregate.args().to_vec();
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval(arg, ctx)?);
            }
            if let NodeKind::Function(aggregate) = &mut self.nodes[id].kind {
                aggregate.accumulate(values.into_iter().next().flatten())?;
            }
        }

        let (left, right) = (self.nodes[id].left, self.nodes[id].right);
        let lhs = self.eval_child(left, ctx)?;
        let rhs = self.eval_child(right, ctx)?;

        let result = match &self.nodes[id].kind {
            NodeKind::Value(v) => Some(Arc::clone(v)),
            NodeKind::Variable(variable) => ctx.variable(variable),
            NodeKind::Parenthesis => lhs,
            NodeKind::Operator(op) => apply(*op, lhs, rhs)?,
            NodeKind::Between { lower, upper } => match lhs {
                Some(v) => Some(boolean(lower.le(&v)? && v.le(upper)?)),
                None => None,
            },
            NodeKind::In(values) => match lhs {
                Some(v) => Some(boolean(contains(values, &v)?)),
                None => None,
            },
            NodeKind::Exists(statement) => Some(boolean(ctx.exists(statement)?)),
            NodeKind::IsNull => lhs.map(|v| boolean(v.is_null())),
            NodeKind::IsNotNull => lhs.map(|v| boolean(!v.is_null())),
            NodeKind::Function(aggregate) => aggregate.current(),
        };
        Ok(result)
    }

    fn eval_child(
        &mut self,
        child: Option<NodeId>,
        ctx: &dyn EvalContext,
    ) -> EvalResult<Option<SharedValue>> {
        match child {
            Some(id) => self.eval(id, ctx),
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn fmt_node(&self, id: Option<NodeId>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(node) = id.and_then(|id| self.nodes.get(id)) else {
            return f.write_str("?");
        };
        match &node.kind {
            NodeKind::Value(v) => write!(f, "{}", Literal(v)),
            NodeKind::Variable(variable) => f.write_str(variable.name()),
            NodeKind::Parenthesis => {
                f.write_str("(")?;
                self.fmt_node(node.left, f)?;
                f.write_str(")")
            }
            NodeKind::Operator(Operator::Not) => {
                f.write_str("NOT ")?;
                self.fmt_operand(node.left, f)
            }
            NodeKind::Operator(op) => {
                self.fmt_operand(node.left, f)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_operand(node.right, f)
            }
            NodeKind::Between { lower, upper } => {
                self.fmt_operand(node.left, f)?;
                write!(f, " BETWEEN {} AND {}", Literal(lower), Literal(upper))
            }
            NodeKind::In(values) => {
                self.fmt_operand(node.left, f)?;
                f.write_str(" IN (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Literal(v))?;
                }
                f.write_str(")")
            }
            NodeKind::Exists(statement) => write!(f, "EXISTS ({statement})"),
            NodeKind::IsNull => {
                self.fmt_operand(node.left, f)?;
                f.write_str(" IS NULL")
            }
            NodeKind::IsNotNull => {
                self.fmt_operand(node.left, f)?;
                f.write_str(" IS NOT NULL")
            }
            NodeKind::Function(aggregate) => {
                write!(f, "{}(", aggregate.function().name())?;
                if aggregate.is_distinct() {
                    f.write_str("DISTINCT ")?;
                }
                for (i, arg) in aggregate.args().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.fmt_node(Some(*arg), f)?;
                }
                f.write_str(")")
            }
        }
    }

    /// Operator operands are wrapped so the rendering shows the tree shape.
    fn fmt_operand(&self, id: Option<NodeId>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match id.and_then(|id| self.nodes.get(id)) {
            Some(node) if !node.kind.is_terminal() => {
                f.write_str("(")?;
                self.fmt_node(id, f)?;
                f.write_str(")")
            }
            _ => self.fmt_node(id, f),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root.is_none() {
            return Ok(());
        }
        self.fmt_node(self.root, f)
    }
}

fn boolean(v: bool) -> SharedValue {
    Value::bool(v).into_shared()
}

fn is_true(v: &Option<SharedValue>) -> bool {
    v.as_deref().is_some_and(Value::is_true)
}

fn apply(
    op: Operator,
    lhs: Option<SharedValue>,
    rhs: Option<SharedValue>,
) -> EvalResult<Option<SharedValue>> {
    match op {
        // Only a canonical false negates to true; an absent operand is
        // treated as true.
        Operator::Not => Ok(Some(boolean(lhs.as_deref().is_some_and(Value::is_false)))),
        Operator::And => Ok(Some(boolean(is_true(&lhs) && is_true(&rhs)))),
        Operator::Or => Ok(Some(boolean(is_true(&lhs) || is_true(&rhs)))),
        Operator::Plus | Operator::Div => {
            let (Some(l), Some(r)) = (lhs, rhs) else {
                return Ok(None);
            };
            let v = if op == Operator::Plus {
                l.add(&r)?
            } else {
                l.div(&r)?
            };
            Ok(Some(v.into_shared()))
        }
        Operator::Equal | Operator::NotEqual | Operator::GreaterThan | Operator::GreaterOrEqual => {
            let (Some(l), Some(r)) = (lhs, rhs) else {
                return Ok(None);
            };
            let comparison = op.comparison().unwrap_or(Comparison::Eq);
            Ok(Some(boolean(l.compare(comparison, &r)?)))
        }
    }
}

/// Linear membership scan. Elements of a kind that cannot be compared with
/// `v` are skipped.
fn contains(values: &[SharedValue], v: &Value) -> EvalResult<bool> {
    for candidate in values {
        if v.is_comparable_with(candidate) && v.eq_value(candidate)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Variable;
    use std::collections::HashMap;

    fn value(v: Value) -> NodeKind {
        NodeKind::Value(v.into_shared())
    }

    fn variable(name: &str) -> NodeKind {
        NodeKind::Variable(Variable::new(name))
    }

    /// Insert each kind in order, moving the cursor to each new node.
    fn build(kinds: Vec<NodeKind>) -> Formula {
        let mut formula = Formula::new();
        let mut cursor = None;
        for kind in kinds {
            let id = formula.push(kind);
            formula.insert(id, cursor, None).unwrap();
            cursor = Some(id);
        }
        formula.check_complete().unwrap();
        formula
    }

    fn ctx(pairs: &[(&str, Value)]) -> HashMap<String, SharedValue> {
        pairs
            .iter()
            .map(|(name, v)| (name.to_string(), v.clone().into_shared()))
            .collect()
    }

    #[test]
    fn test_tighter_operator_binds_first() {
        let formula = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Plus),
            variable("b"),
            NodeKind::Operator(Operator::Div),
            variable("c"),
        ]);
        assert_eq!(formula.to_string(), "a + (b / c)");

        let formula = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Div),
            variable("b"),
            NodeKind::Operator(Operator::Plus),
            variable("c"),
        ]);
        assert_eq!(formula.to_string(), "(a / b) + c");
    }

    #[test]
    fn test_equal_rank_nests_right() {
        let formula = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Or),
            variable("b"),
            NodeKind::Operator(Operator::Or),
            variable("c"),
        ]);
        assert_eq!(formula.to_string(), "a OR (b OR c)");
        let root = formula.root_node().unwrap();
        assert!(matches!(root.kind(), NodeKind::Operator(Operator::Or)));
        let right = formula.node(root.right().unwrap()).unwrap();
        assert!(matches!(right.kind(), NodeKind::Operator(Operator::Or)));
        assert_eq!(right.parent(), formula.root());
    }

    #[test]
    fn test_terminal_without_slot_is_rejected() {
        let mut formula = Formula::new();
        let a = formula.push(variable("a"));
        formula.insert(a, None, None).unwrap();
        let b = formula.push(variable("b"));
        assert_eq!(
            formula.insert(b, Some(a), None),
            Err(ParseError::Misplaced("column"))
        );
    }

    #[test]
    fn test_incomplete_tree_is_detected() {
        let mut formula = Formula::new();
        let a = formula.push(variable("a"));
        formula.insert(a, None, None).unwrap();
        let eq = formula.push(NodeKind::Operator(Operator::Equal));
        formula.insert(eq, Some(a), None).unwrap();
        assert_eq!(formula.check_complete(), Err(ParseError::Incomplete("=")));
    }

    #[test]
    fn test_comparison_with_absent_side_is_absent() {
        let mut formula = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Equal),
            value(Value::int32(1)),
        ]);
        assert_eq!(formula.evaluate(&ctx(&[])).unwrap(), None);
        let hit = formula.evaluate(&ctx(&[("a", Value::int32(1))])).unwrap();
        assert_eq!(hit.as_deref(), Some(&Value::bool(true)));
    }

    #[test]
    fn test_not_of_absent_is_false() {
        let mut formula = build(vec![NodeKind::Operator(Operator::Not), variable("flag")]);
        assert_eq!(formula.to_string(), "NOT flag");
        assert!(!formula.matches(&ctx(&[])).unwrap());
        assert!(formula.matches(&ctx(&[("flag", Value::bool(false))])).unwrap());
        assert!(!formula.matches(&ctx(&[("flag", Value::bool(true))])).unwrap());
    }

    #[test]
    fn test_and_or_treat_absent_as_not_true() {
        let mut and = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::And),
            variable("b"),
        ]);
        let mut or = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Or),
            variable("b"),
        ]);
        let only_a = ctx(&[("a", Value::bool(true))]);
        assert!(!and.matches(&only_a).unwrap());
        assert!(or.matches(&only_a).unwrap());
    }

    #[test]
    fn test_arithmetic_errors_propagate() {
        let mut formula = build(vec![
            variable("a"),
            NodeKind::Operator(Operator::Div),
            value(Value::int32(0)),
        ]);
        assert!(formula.evaluate(&ctx(&[("a", Value::int32(4))])).is_err());
    }

    #[test]
    fn test_in_skips_incomparable_elements() {
        let values = vec![Value::string("x").into_shared(), Value::int32(2).into_shared()];
        let mut formula = build(vec![variable("a"), NodeKind::In(values)]);
        assert_eq!(formula.to_string(), "a IN ('x', 2)");
        assert!(formula.matches(&ctx(&[("a", Value::int32(2))])).unwrap());
        assert!(!formula.matches(&ctx(&[("a", Value::int32(3))])).unwrap());
        assert_eq!(formula.evaluate(&ctx(&[])).unwrap(), None);
    }

    #[test]
    fn test_is_null_on_absent_is_absent() {
        let mut formula = build(vec![variable("a"), NodeKind::IsNull]);
        assert_eq!(formula.evaluate(&ctx(&[])).unwrap(), None);
        let null = ctx(&[("a", Value::null_of(vg_core::ScalarKind::Int32))]);
        assert!(formula.matches(&null).unwrap());
    }

    #[test]
    fn test_exists_needs_context_support() {
        let mut formula = build(vec![NodeKind::Exists("select 1".to_string())]);
        assert_eq!(
            formula.evaluate(&ctx(&[])),
            Err(crate::error::EvalError::ExistsUnsupported)
        );
    }

    #[test]
    fn test_empty_formula_evaluates_to_absent() {
        let mut formula = Formula::new();
        assert!(formula.is_empty());
        assert_eq!(formula.evaluate(&ctx(&[])).unwrap(), None);
        assert_eq!(formula.to_string(), "");
    }
}
