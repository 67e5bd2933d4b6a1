//! A minimal, hand-buildable intermediate representation satisfying the `Var`/`Stmt`/`IR`/`CFG`
//! contracts the analysis core consumes (§3, §4.11). Front-ends that lower real source or
//! bytecode into this shape are out of scope (§1); this module exists so the solver fabric can
//! be exercised and tested end-to-end.

pub mod cfg;
pub mod expr;
pub mod method;
pub mod stmt;
pub mod var;

pub use cfg::{Cfg, CfgNode, EdgeKind};
pub use expr::{BinOp, Exp, Operand};
pub use method::{Method, Program};
pub use stmt::{CallSite, FieldAccess, InvokeKind, Stmt};
pub use var::{PrimitiveType, Var};
