//! # vg-verify — The "Law" of VIGIL
//!
//! Invariants of the query engine, checked two ways:
//!
//! - Kani proof harnesses (`cargo kani --package vg-verify`) exhaust the
//!   signed/unsigned comparison rules and checked integer arithmetic over
//!   every input.
//! - Property and scenario tests under `tests/` drive the parsers and
//!   formulas with generated statements and rows.
//!
//! Both measure the engine against the reference models below.

use vg_core::Comparison;

/// Mathematical comparison of an `Int32` against a `UInt64`, computed in a
/// type wide enough to hold both.
pub fn reference_compare(op: Comparison, lhs: i32, rhs: u64) -> bool {
    op.holds(i128::from(lhs).cmp(&i128::from(rhs)))
}

/// Every comparison the engine evaluates.
pub const ALL_COMPARISONS: [Comparison; 6] = [
    Comparison::Eq,
    Comparison::Ne,
    Comparison::Lt,
    Comparison::Le,
    Comparison::Gt,
    Comparison::Ge,
];

#[cfg(kani)]
mod proofs {
    use super::*;
    use vg_core::{compare_signed_unsigned, Value};

    fn any_comparison() -> Comparison {
        let pick: u8 = kani::any();
        kani::assume(pick < 6);
        ALL_COMPARISONS[pick as usize]
    }

    /// **Proof: signed/unsigned promotion is exact**
    ///
    /// For every `i32`, `u64` and comparison, the promoted comparison agrees
    /// with the mathematical one. A negative left side is below every
    /// unsigned value.
    #[kani::proof]
    fn verify_signed_unsigned_compare() {
        let op = any_comparison();
        let lhs: i32 = kani::any();
        let rhs: u64 = kani::any();
        assert_eq!(
            compare_signed_unsigned(op, lhs, rhs),
            reference_compare(op, lhs, rhs)
        );
    }

    /// **Proof: mixed-kind comparison is mirror-symmetric**
    ///
    /// `a op b` on an `Int32`/`UInt64` pair equals `b op' a` with the
    /// mirrored operator.
    #[kani::proof]
    fn verify_mixed_compare_mirrors() {
        let op = any_comparison();
        let signed = Value::int32(kani::any());
        let unsigned = Value::uint64(kani::any());
        let forward = signed.compare(op, &unsigned);
        let backward = unsigned.compare(op.mirrored(), &signed);
        assert_eq!(forward, backward);
    }

    /// **Proof: Int32 addition never wraps**
    ///
    /// `+` succeeds exactly when the native checked addition does, and then
    /// yields the same sum.
    #[kani::proof]
    fn verify_int32_add_is_checked() {
        let a: i32 = kani::any();
        let b: i32 = kani::any();
        let sum = Value::int32(a).add(&Value::int32(b));
        match a.checked_add(b) {
            Some(expected) => assert_eq!(sum, Ok(Value::int32(expected))),
            None => assert!(sum.is_err()),
        }
    }

    /// **Proof: Int32 division never traps**
    ///
    /// Division by zero and `i32::MIN / -1` are reported as errors instead
    /// of panicking.
    #[kani::proof]
    fn verify_int32_div_is_checked() {
        let a: i32 = kani::any();
        let b: i32 = kani::any();
        let quotient = Value::int32(a).div(&Value::int32(b));
        match a.checked_div(b) {
            Some(expected) => assert_eq!(quotient, Ok(Value::int32(expected))),
            None => assert!(quotient.is_err()),
        }
    }
}
