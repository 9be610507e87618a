//! # Scalar Values
//!
//! The leaf atoms every row is built from. A [`Value`] is immutable once
//! constructed and is shared through [`SharedValue`] (an `Arc`), so one cell
//! can sit in several rows, indices and evaluation results at the same time
//! and is dropped exactly once, when the last holder lets go.
//!
//! # Operator rules
//!
//! Arithmetic and comparison are defined between values of the same kind,
//! with one exception: `Int32` and `UInt64` compare with each other. A
//! negative `Int32` sits below every `UInt64`.
//!
//! | Operator           | Bool | Int32 | UInt64 | Double | String |
//! |--------------------|------|-------|--------|--------|--------|
//! | `+`                |      | yes   | yes    | yes    | concat |
//! | `/`                |      | yes   | yes    | yes    |        |
//! | `==` `!=`          | yes  | yes   | yes    | yes    | yes    |
//! | `<` `<=` `>` `>=`  |      | yes   | yes    | yes    | yes    |
//!
//! A comparison with a null operand is `false`; arithmetic with a null
//! operand yields a null of the left-hand kind.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier attached to a value by the data source that produced it.
pub type ItemId = u64;

/// Id carried by values that were not produced by an identified item.
pub const ANONYMOUS_ITEM_ID: ItemId = u64::MAX;

/// Reference-counted handle to an immutable [`Value`].
pub type SharedValue = Arc<Value>;

/// The closed set of scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int32,
    #[serde(rename = "uint64")]
    UInt64,
    Double,
    String,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::UInt64 => "uint64",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::UInt64 | Self::Double)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw payload of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Bool(bool),
    Int32(i32),
    UInt64(u64),
    Double(f64),
    String(String),
}

impl Datum {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int32(_) => ScalarKind::Int32,
            Self::UInt64(_) => ScalarKind::UInt64,
            Self::Double(_) => ScalarKind::Double,
            Self::String(_) => ScalarKind::String,
        }
    }

    fn zero_of(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(false),
            ScalarKind::Int32 => Self::Int32(0),
            ScalarKind::UInt64 => Self::UInt64(0),
            ScalarKind::Double => Self::Double(0.0),
            ScalarKind::String => Self::String(String::new()),
        }
    }
}

/// Hashable identity of a value, used by column indices and `COUNT(DISTINCT)`.
///
/// Doubles are keyed by their bit pattern with `-0.0` folded onto `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatumKey {
    Null(ScalarKind),
    Bool(bool),
    Int32(i32),
    UInt64(u64),
    Double(u64),
    String(String),
}

// =============================================================================
// Comparison operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether `lhs.cmp(rhs) == ordering` satisfies this comparison.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }

    /// The comparison that gives the same answer with the operands swapped.
    pub fn mirrored(&self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    fn defined_for(&self, lhs: ScalarKind, rhs: ScalarKind) -> bool {
        match (lhs, rhs) {
            (ScalarKind::Bool, ScalarKind::Bool) => self.is_equality(),
            (ScalarKind::Int32, ScalarKind::UInt64) | (ScalarKind::UInt64, ScalarKind::Int32) => {
                true
            }
            (l, r) => l == r,
        }
    }
}

/// Compare an `Int32` against a `UInt64` under the promotion rules.
///
/// A negative left-hand side is less than every unsigned value. Asking
/// whether it is `>=` or `==` an unsigned value answers `false` and logs a
/// diagnostic.
pub fn compare_signed_unsigned(op: Comparison, lhs: i32, rhs: u64) -> bool {
    if lhs < 0 {
        return match op {
            Comparison::Lt | Comparison::Le | Comparison::Ne => true,
            Comparison::Gt => false,
            Comparison::Ge | Comparison::Eq => {
                tracing::warn!(
                    "Negative int32 {} compared {} uint64 {}; treating as false",
                    lhs,
                    op.symbol(),
                    rhs
                );
                false
            }
        };
    }
    op.holds((lhs as u64).cmp(&rhs))
}

// =============================================================================
// Value
// =============================================================================

/// A typed, nullable scalar with an optional item id.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    id: ItemId,
    datum: Datum,
    null: bool,
}

impl Value {
    pub fn new(datum: Datum) -> Self {
        Self::with_id(ANONYMOUS_ITEM_ID, datum)
    }

    pub fn with_id(id: ItemId, datum: Datum) -> Self {
        Self {
            id,
            datum,
            null: false,
        }
    }

    /// A null value of the given kind.
    pub fn null_of(kind: ScalarKind) -> Self {
        Self {
            id: ANONYMOUS_ITEM_ID,
            datum: Datum::zero_of(kind),
            null: true,
        }
    }

    pub fn bool(v: bool) -> Self {
        Self::new(Datum::Bool(v))
    }

    pub fn int32(v: i32) -> Self {
        Self::new(Datum::Int32(v))
    }

    pub fn uint64(v: u64) -> Self {
        Self::new(Datum::UInt64(v))
    }

    pub fn double(v: f64) -> Self {
        Self::new(Datum::Double(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(Datum::String(v.into()))
    }

    /// Parse an unquoted numeric literal.
    ///
    /// A literal with a fractional part becomes a `Double`; otherwise it is
    /// an `Int32` when it fits and a `UInt64` when it does not.
    pub fn from_numeric_literal(text: &str) -> Option<Self> {
        if text.contains('.') {
            return text.parse::<f64>().ok().map(Self::double);
        }
        if let Ok(v) = text.parse::<i32>() {
            return Some(Self::int32(v));
        }
        text.parse::<u64>().ok().map(Self::uint64)
    }

    pub fn into_shared(self) -> SharedValue {
        Arc::new(self)
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_ITEM_ID
    }

    pub fn kind(&self) -> ScalarKind {
        self.datum.kind()
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    /// The canonical `true`: a non-null `Bool(true)`.
    pub fn is_true(&self) -> bool {
        !self.null && self.datum == Datum::Bool(true)
    }

    /// The canonical `false`: a non-null `Bool(false)`.
    pub fn is_false(&self) -> bool {
        !self.null && self.datum == Datum::Bool(false)
    }

    pub fn key(&self) -> DatumKey {
        if self.null {
            return DatumKey::Null(self.kind());
        }
        match &self.datum {
            Datum::Bool(v) => DatumKey::Bool(*v),
            Datum::Int32(v) => DatumKey::Int32(*v),
            Datum::UInt64(v) => DatumKey::UInt64(*v),
            Datum::Double(v) if *v == 0.0 => DatumKey::Double(0.0f64.to_bits()),
            Datum::Double(v) => DatumKey::Double(v.to_bits()),
            Datum::String(v) => DatumKey::String(v.clone()),
        }
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    pub fn add(&self, rhs: &Value) -> Result<Value> {
        let (lhs_kind, rhs_kind) = (self.kind(), rhs.kind());
        if lhs_kind != rhs_kind || lhs_kind == ScalarKind::Bool {
            return Err(Error::undefined("+", lhs_kind, rhs_kind));
        }
        if self.null || rhs.null {
            return Ok(Value::null_of(lhs_kind));
        }
        let overflow = || Error::invalid("+", lhs_kind, rhs_kind, "integer overflow");
        let datum = match (&self.datum, &rhs.datum) {
            (Datum::Int32(a), Datum::Int32(b)) => Datum::Int32(a.checked_add(*b).ok_or_else(overflow)?),
            (Datum::UInt64(a), Datum::UInt64(b)) => {
                Datum::UInt64(a.checked_add(*b).ok_or_else(overflow)?)
            }
            (Datum::Double(a), Datum::Double(b)) => Datum::Double(a + b),
            (Datum::String(a), Datum::String(b)) => Datum::String(format!("{a}{b}")),
            _ => return Err(Error::undefined("+", lhs_kind, rhs_kind)),
        };
        Ok(Value::new(datum))
    }

    pub fn div(&self, rhs: &Value) -> Result<Value> {
        let (lhs_kind, rhs_kind) = (self.kind(), rhs.kind());
        if lhs_kind != rhs_kind || !lhs_kind.is_numeric() {
            return Err(Error::undefined("/", lhs_kind, rhs_kind));
        }
        if self.null || rhs.null {
            return Ok(Value::null_of(lhs_kind));
        }
        let by_zero = || Error::invalid("/", lhs_kind, rhs_kind, "division by zero");
        let datum = match (&self.datum, &rhs.datum) {
            (Datum::Int32(_), Datum::Int32(0)) | (Datum::UInt64(_), Datum::UInt64(0)) => {
                return Err(by_zero())
            }
            (Datum::Int32(a), Datum::Int32(b)) => Datum::Int32(
                a.checked_div(*b)
                    .ok_or_else(|| Error::invalid("/", lhs_kind, rhs_kind, "integer overflow"))?,
            ),
            (Datum::UInt64(a), Datum::UInt64(b)) => Datum::UInt64(a / b),
            (Datum::Double(_), Datum::Double(b)) if *b == 0.0 => return Err(by_zero()),
            (Datum::Double(a), Datum::Double(b)) => {
                let quotient = a / b;
                if !quotient.is_finite() {
                    return Err(Error::invalid("/", lhs_kind, rhs_kind, "non-finite result"));
                }
                Datum::Double(quotient)
            }
            _ => return Err(Error::undefined("/", lhs_kind, rhs_kind)),
        };
        Ok(Value::new(datum))
    }

    /// `self += rhs`, keeping this value's id.
    pub fn add_assign(&mut self, rhs: &Value) -> Result<()> {
        let sum = self.add(rhs)?;
        self.datum = sum.datum;
        self.null = sum.null;
        Ok(())
    }

    /// Overwrite the payload with `rhs`'s, keeping this value's id.
    pub fn assign(&mut self, rhs: &Value) -> Result<()> {
        if self.kind() != rhs.kind() {
            return Err(Error::undefined("=", self.kind(), rhs.kind()));
        }
        self.datum = rhs.datum.clone();
        self.null = rhs.null;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Comparison
    // -------------------------------------------------------------------------

    pub fn compare(&self, op: Comparison, rhs: &Value) -> Result<bool> {
        let (lhs_kind, rhs_kind) = (self.kind(), rhs.kind());
        if !op.defined_for(lhs_kind, rhs_kind) {
            return Err(Error::undefined(op.symbol(), lhs_kind, rhs_kind));
        }
        if self.null || rhs.null {
            return Ok(false);
        }
        let ordering = match (&self.datum, &rhs.datum) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int32(a), Datum::Int32(b)) => a.cmp(b),
            (Datum::UInt64(a), Datum::UInt64(b)) => a.cmp(b),
            (Datum::Double(a), Datum::Double(b)) => match a.partial_cmp(b) {
                Some(ordering) => ordering,
                // NaN is unordered and unequal to everything.
                None => return Ok(op == Comparison::Ne),
            },
            (Datum::String(a), Datum::String(b)) => a.cmp(b),
            (Datum::Int32(a), Datum::UInt64(b)) => return Ok(compare_signed_unsigned(op, *a, *b)),
            (Datum::UInt64(a), Datum::Int32(b)) => {
                return Ok(compare_signed_unsigned(op.mirrored(), *b, *a))
            }
            _ => return Err(Error::undefined(op.symbol(), lhs_kind, rhs_kind)),
        };
        Ok(op.holds(ordering))
    }

    pub fn eq_value(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Eq, rhs)
    }

    pub fn ne_value(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Ne, rhs)
    }

    pub fn lt(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Lt, rhs)
    }

    pub fn le(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Le, rhs)
    }

    pub fn gt(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Gt, rhs)
    }

    pub fn ge(&self, rhs: &Value) -> Result<bool> {
        self.compare(Comparison::Ge, rhs)
    }

    /// Whether `self == rhs` is answerable at all (same kind, or the
    /// `Int32`/`UInt64` pair).
    pub fn is_comparable_with(&self, rhs: &Value) -> bool {
        Comparison::Eq.defined_for(self.kind(), rhs.kind())
    }
}

// =============================================================================
// Casts
// =============================================================================

fn cast_error(value: &Value, to: ScalarKind) -> Error {
    Error::undefined("cast", value.kind(), to)
}

impl TryFrom<&Value> for bool {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value.datum {
            Datum::Bool(v) => Ok(v),
            _ => Err(cast_error(value, ScalarKind::Bool)),
        }
    }
}

impl TryFrom<&Value> for i32 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value.datum {
            Datum::Int32(v) => Ok(v),
            _ => Err(cast_error(value, ScalarKind::Int32)),
        }
    }
}

impl TryFrom<&Value> for u64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value.datum {
            Datum::UInt64(v) => Ok(v),
            Datum::Int32(v) => u64::try_from(v).map_err(|_| {
                Error::invalid("cast", ScalarKind::Int32, ScalarKind::UInt64, "negative value")
            }),
            _ => Err(cast_error(value, ScalarKind::UInt64)),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value.datum {
            Datum::Double(v) => Ok(v),
            _ => Err(cast_error(value, ScalarKind::Double)),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match &value.datum {
            Datum::String(v) => Ok(v.clone()),
            _ => Err(cast_error(value, ScalarKind::String)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::int32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::uint64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::string(v)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        if value.null {
            return serde_json::Value::Null;
        }
        match &value.datum {
            Datum::Bool(v) => serde_json::Value::Bool(*v),
            Datum::Int32(v) => serde_json::Value::Number((*v).into()),
            Datum::UInt64(v) => serde_json::Value::Number((*v).into()),
            Datum::Double(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Datum::String(v) => serde_json::Value::String(v.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            return f.write_str("NULL");
        }
        match &self.datum {
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Int32(v) => write!(f, "{v}"),
            Datum::UInt64(v) => write!(f, "{v}"),
            Datum::Double(v) => write!(f, "{v}"),
            Datum::String(v) => f.write_str(v),
        }
    }
}
