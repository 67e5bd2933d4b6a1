//! Expressions that can appear on the right-hand side of an `Assign`, as an `If` condition, or
//! as a call argument.

use super::var::Var;

/// An operand to a binary expression or a standalone right-hand side: either a variable
/// reference or an integer literal (§4.2's `evaluate`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A reference to a local variable.
    Var(Var),
    /// An integer literal.
    IntLiteral(i32),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(v) => write!(f, "{v}"),
            Self::IntLiteral(k) => write!(f, "{k}"),
        }
    }
}

/// A binary operator recognised by constant propagation's numeric semantics (§6).
///
/// `Unsupported` stands in for any operator the original IR might carry that falls outside
/// the 32-bit-signed-integer domain this engine models (e.g. floating-point comparisons) —
/// §4.2 requires such operators to degrade to `NAC` rather than abort the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`, wraps modulo 2^32.
    Add,
    /// `-`, wraps modulo 2^32.
    Sub,
    /// `*`, wraps modulo 2^32.
    Mul,
    /// `/`, truncated toward zero; `UNDEF` on division by a zero constant.
    Div,
    /// `%`, sign of the dividend; `UNDEF` on a zero constant divisor.
    Rem,
    /// `<<`, shift amount masked to 5 bits.
    Shl,
    /// `>>`, arithmetic (sign-extending) shift.
    Shr,
    /// `>>>`, logical (zero-filling) shift.
    UShr,
    /// `&`.
    And,
    /// `|`.
    Or,
    /// `^`.
    Xor,
    /// `==`, yields `CONST(1)`/`CONST(0)`.
    Eq,
    /// `!=`, yields `CONST(1)`/`CONST(0)`.
    Ne,
    /// `<`, yields `CONST(1)`/`CONST(0)`.
    Lt,
    /// `<=`, yields `CONST(1)`/`CONST(0)`.
    Le,
    /// `>`, yields `CONST(1)`/`CONST(0)`.
    Gt,
    /// `>=`, yields `CONST(1)`/`CONST(0)`.
    Ge,
    /// An operator outside the recognised integer domain (see struct docs).
    Unsupported,
}

impl BinOp {
    /// Whether this operator can produce `UNDEF` when its right operand is the constant zero
    /// (§4.2's division-by-zero rule).
    #[must_use]
    pub const fn is_div_or_rem(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }
}

/// A right-hand-side expression of an `Assign` statement (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exp {
    /// A bare operand: `x = y` or `x = 3`.
    Operand(Operand),
    /// A binary expression: `x = a op b`.
    Binary {
        /// The operator.
        op: BinOp,
        /// The left operand.
        left: Operand,
        /// The right operand.
        right: Operand,
    },
}

impl std::fmt::Display for Exp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operand(o) => write!(f, "{o}"),
            Self::Binary { op, left, right } => write!(f, "{left} {op:?} {right}"),
        }
    }
}
