//! The closed statement hierarchy (§3) and invocation call sites.

use super::expr::{Exp, Operand};
use super::var::Var;
use crate::refs::{ClassRef, FieldRef, MethodRef};

/// How a field is addressed: on a class (`static`) or through a base variable (instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccess {
    /// A static field, addressed by its declaring class and name.
    Static(FieldRef),
    /// An instance field, addressed through a base variable and a field name.
    Instance(Var, std::sync::Arc<str>),
}

/// The dispatch kind of an invocation (§1, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// Resolved statically to the declaring class's method; no receiver.
    Static,
    /// Resolved by walking up superclasses from the static receiver type (`super.m()`,
    /// private calls, constructors).
    Special,
    /// Resolved dynamically by the receiver object's runtime class.
    Virtual,
    /// Resolved dynamically through an interface method.
    Interface,
}

/// A single call site: the target method, its dispatch kind, receiver (if any), arguments,
/// and the variable receiving the result (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// The dispatch kind.
    pub kind: InvokeKind,
    /// The statically declared target (the method CHA/virtual dispatch resolves *from*).
    pub method: MethodRef,
    /// The receiver variable; `None` for [`InvokeKind::Static`].
    pub receiver: Option<Var>,
    /// The argument operands, in declaration order.
    pub args: Vec<Operand>,
    /// The variable that receives the call's result, if the result is used.
    pub lhs: Option<Var>,
}

/// A statement: the closed algebraic data type the whole engine pattern-matches on (§3, §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `lhs = rhs`, where `rhs` is an int-holding expression.
    Assign {
        /// The assigned variable.
        lhs: Var,
        /// The expression producing its value.
        rhs: Exp,
    },
    /// A conditional branch; `true_target` is this method's statement index to jump to when
    /// `cond` is non-zero, the fall-through successor is implicit.
    If {
        /// The branch condition.
        cond: Operand,
        /// The statement index to jump to when the condition is true.
        true_target: usize,
    },
    /// A multi-way branch over an int-holding variable.
    Switch {
        /// The variable switched on.
        var: Var,
        /// `(case value, target statement index)` pairs.
        cases: Vec<(i32, usize)>,
        /// The statement index to jump to when no case matches.
        default: usize,
    },
    /// A method invocation.
    Invoke {
        /// The call site.
        call: CallSite,
    },
    /// `lhs = new C()`.
    New {
        /// The allocated variable.
        lhs: Var,
        /// The allocated class.
        class: ClassRef,
    },
    /// `lhs = rhs` for reference-typed variables (kept distinct from `Assign`, which is
    /// reserved for int-holding expressions).
    Copy {
        /// The assigned variable.
        lhs: Var,
        /// The copied variable.
        rhs: Var,
    },
    /// `lhs = <field>`.
    LoadField {
        /// The variable receiving the field's value.
        lhs: Var,
        /// The field being read.
        field: FieldAccess,
    },
    /// `<field> = rhs`.
    StoreField {
        /// The field being written.
        field: FieldAccess,
        /// The stored value.
        rhs: Operand,
    },
    /// `lhs = base[index]`.
    LoadArray {
        /// The variable receiving the element's value.
        lhs: Var,
        /// The array variable.
        base: Var,
        /// The index operand.
        index: Operand,
    },
    /// `base[index] = rhs`.
    StoreArray {
        /// The array variable.
        base: Var,
        /// The index operand.
        index: Operand,
        /// The stored value.
        rhs: Operand,
    },
    /// `return var;` or `return;`.
    Return {
        /// The returned variable, if any.
        var: Option<Var>,
    },
    /// A control-only / no-op statement (e.g. a label with no effect).
    Nop,
}

impl Stmt {
    /// The variable this statement defines, if any (§3).
    #[must_use]
    pub fn def(&self) -> Option<Var> {
        match self {
            Self::Assign { lhs, .. }
            | Self::New { lhs, .. }
            | Self::Copy { lhs, .. }
            | Self::LoadField { lhs, .. }
            | Self::LoadArray { lhs, .. } => Some(lhs.clone()),
            Self::Invoke { call } => call.lhs.clone(),
            Self::If { .. }
            | Self::Switch { .. }
            | Self::StoreField { .. }
            | Self::StoreArray { .. }
            | Self::Return { .. }
            | Self::Nop => None,
        }
    }

    /// The variables this statement reads (§3). Literal operands are not variables and are
    /// therefore omitted.
    #[must_use]
    pub fn uses(&self) -> Vec<Var> {
        fn operand_var(op: &Operand) -> Option<Var> {
            match op {
                Operand::Var(v) => Some(v.clone()),
                Operand::IntLiteral(_) => None,
            }
        }

        match self {
            Self::Assign { rhs, .. } => match rhs {
                Exp::Operand(o) => operand_var(o).into_iter().collect(),
                Exp::Binary { left, right, .. } => {
                    [operand_var(left), operand_var(right)].into_iter().flatten().collect()
                }
            },
            Self::If { cond, .. } => operand_var(cond).into_iter().collect(),
            Self::Switch { var, .. } => vec![var.clone()],
            Self::Invoke { call } => call
                .receiver
                .iter()
                .cloned()
                .chain(call.args.iter().filter_map(operand_var))
                .collect(),
            Self::New { .. } => vec![],
            Self::Copy { rhs, .. } => vec![rhs.clone()],
            Self::LoadField { field, .. } | Self::StoreField { field, .. } => match field {
                FieldAccess::Static(_) => vec![],
                FieldAccess::Instance(base, _) => vec![base.clone()],
            }
            .into_iter()
            .chain(match self {
                Self::StoreField { rhs, .. } => operand_var(rhs),
                _ => None,
            })
            .collect(),
            Self::LoadArray { base, index, .. } => {
                [Some(base.clone()), operand_var(index)].into_iter().flatten().collect()
            }
            Self::StoreArray { base, index, rhs } => {
                [Some(base.clone()), operand_var(index), operand_var(rhs)]
                    .into_iter()
                    .flatten()
                    .collect()
            }
            Self::Return { var } => var.iter().cloned().collect(),
            Self::Nop => vec![],
        }
    }

    /// Whether evaluating this statement's right-hand side can have an observable effect
    /// beyond defining its LHS (§4.3): allocation, field/array access, and `DIV`/`REM`
    /// arithmetic all count, by the dead-code detector's exclusion rule.
    #[must_use]
    pub fn has_potential_side_effect(&self) -> bool {
        match self {
            Self::New { .. }
            | Self::LoadField { .. }
            | Self::StoreField { .. }
            | Self::LoadArray { .. }
            | Self::StoreArray { .. }
            | Self::Invoke { .. } => true,
            Self::Assign { rhs, .. } => {
                matches!(rhs, Exp::Binary { op, .. } if op.is_div_or_rem())
            }
            Self::Copy { .. } | Self::If { .. } | Self::Switch { .. } | Self::Return { .. } | Self::Nop => {
                false
            }
        }
    }
}
