//! Compile-time evaluation of instructions whose operands are all literals.
//!
//! Results match what the emitted machine code would compute: 64-bit
//! two's-complement arithmetic with truncating division.

use crate::ir::{Opcode, Predicate};

/// Folds a binary arithmetic opcode. Returns `None` for anything that would
/// trap at run time (division by zero, `i64::MIN / -1`) and for opcodes that
/// are not binary arithmetic.
pub fn fold_binary(opcode: &Opcode, lhs: i64, rhs: i64) -> Option<i64> {
    match opcode {
        Opcode::Add => Some(lhs.wrapping_add(rhs)),
        Opcode::Sub => Some(lhs.wrapping_sub(rhs)),
        Opcode::Mul => Some(lhs.wrapping_mul(rhs)),
        Opcode::SDiv => lhs.checked_div(rhs),
        Opcode::SRem => lhs.checked_rem(rhs),
        Opcode::Or => Some(lhs | rhs),
        Opcode::And => Some(lhs & rhs),
        _ => None,
    }
}

pub fn fold_compare(predicate: Predicate, lhs: i64, rhs: i64) -> i64 {
    predicate.evaluate(lhs, rhs) as i64
}
