//! `evaluate`: the expression-level transfer of §4.2, and the bit-exact 32-bit integer
//! semantics of §6.

use crate::ir::{BinOp, Exp, Operand};
use crate::lattice::{CPFact, Value};

/// Evaluates an operand against `fact` (`Var` → lookup, `IntLiteral` → `CONST`).
#[must_use]
pub fn eval_operand(operand: &Operand, fact: &CPFact) -> Value {
    match operand {
        Operand::Var(v) => fact.get(v),
        Operand::IntLiteral(k) => Value::Const(*k),
    }
}

/// Evaluates an expression against `fact` (§4.2's `evaluate`).
#[must_use]
pub fn evaluate(exp: &Exp, fact: &CPFact) -> Value {
    match exp {
        Exp::Operand(o) => eval_operand(o, fact),
        Exp::Binary { op, left, right } => {
            let l = eval_operand(left, fact);
            let r = eval_operand(right, fact);
            eval_binary(*op, l, r)
        }
    }
}

/// The binary-operator transfer (§4.2): division/remainder by a zero constant is `UNDEF`
/// (deliberately, so dead-code detection can still fire); otherwise `NAC` dominates, then
/// `UNDEF`, then both-constant folding via [`apply_op`].
#[must_use]
pub fn eval_binary(op: BinOp, l: Value, r: Value) -> Value {
    if op.is_div_or_rem() && r == Value::Const(0) {
        return Value::Undef;
    }
    match (l, r) {
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        (Value::Undef, _) | (_, Value::Undef) => Value::Undef,
        (Value::Const(a), Value::Const(b)) => apply_op(op, a, b),
    }
}

/// The bit-exact 32-bit signed-integer semantics of §6. `Unsupported` (an operator outside the
/// recognised domain) falls back to `NAC` rather than panicking.
#[must_use]
pub fn apply_op(op: BinOp, a: i32, b: i32) -> Value {
    match op {
        BinOp::Add => Value::Const(a.wrapping_add(b)),
        BinOp::Sub => Value::Const(a.wrapping_sub(b)),
        BinOp::Mul => Value::Const(a.wrapping_mul(b)),
        BinOp::Div => {
            if b == 0 {
                Value::Undef
            } else {
                Value::Const(a.wrapping_div(b))
            }
        }
        BinOp::Rem => {
            if b == 0 {
                Value::Undef
            } else {
                Value::Const(a.wrapping_rem(b))
            }
        }
        BinOp::Shl => Value::Const(a.wrapping_shl((b & 0x1f) as u32)),
        BinOp::Shr => Value::Const(a.wrapping_shr((b & 0x1f) as u32)),
        BinOp::UShr => Value::Const(((a as u32).wrapping_shr((b & 0x1f) as u32)) as i32),
        BinOp::And => Value::Const(a & b),
        BinOp::Or => Value::Const(a | b),
        BinOp::Xor => Value::Const(a ^ b),
        BinOp::Eq => Value::Const(i32::from(a == b)),
        BinOp::Ne => Value::Const(i32::from(a != b)),
        BinOp::Lt => Value::Const(i32::from(a < b)),
        BinOp::Le => Value::Const(i32::from(a <= b)),
        BinOp::Gt => Value::Const(i32::from(a > b)),
        BinOp::Ge => Value::Const(i32::from(a >= b)),
        BinOp::Unsupported => Value::Nac,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_by_zero_is_undef() {
        assert_eq!(eval_binary(BinOp::Div, Value::Const(10), Value::Const(0)), Value::Undef);
        assert_eq!(eval_binary(BinOp::Rem, Value::Const(10), Value::Const(0)), Value::Undef);
    }

    #[test]
    fn nac_dominates_unless_div_by_zero() {
        assert_eq!(eval_binary(BinOp::Add, Value::Nac, Value::Const(1)), Value::Nac);
        assert_eq!(eval_binary(BinOp::Div, Value::Nac, Value::Const(0)), Value::Undef);
    }

    #[test]
    fn add_wraps_modulo_2_32() {
        assert_eq!(apply_op(BinOp::Add, i32::MAX, 1), Value::Const(i32::MIN));
    }

    #[test]
    fn shl_masks_shift_amount() {
        // shift by 33 == shift by 1
        assert_eq!(apply_op(BinOp::Shl, 1, 33), Value::Const(2));
    }

    #[test]
    fn ushr_is_logical() {
        assert_eq!(apply_op(BinOp::UShr, -1, 28), Value::Const(0xF));
    }

    #[test]
    fn shr_is_arithmetic() {
        assert_eq!(apply_op(BinOp::Shr, -8, 1), Value::Const(-4));
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        assert_eq!(apply_op(BinOp::Lt, 1, 2), Value::Const(1));
        assert_eq!(apply_op(BinOp::Lt, 2, 1), Value::Const(0));
    }

    #[test]
    fn unsupported_degrades_to_nac() {
        assert_eq!(apply_op(BinOp::Unsupported, 1, 2), Value::Nac);
    }
}
