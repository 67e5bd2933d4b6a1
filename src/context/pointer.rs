//! Context-sensitive pointers: the C6 [`crate::pfg::Pointer`] shape, re-keyed by [`Context`]
//! (§4.6 — "every pointer is keyed by a context"). Static fields stay global: a context-sensitive
//! solver still shares one `StaticField` pointer per field, since static state is not
//! object/call-site qualified in this model.

use std::sync::Arc;

use super::Context;
use crate::ir::Var;
use crate::pfg::HeapObj;
use crate::refs::FieldRef;

/// A context-sensitive heap object: the plain [`HeapObj`] paired with the context it was
/// allocated under (`selectHeapContext`, §4.6).
pub type CsObj = (Context, HeapObj);

/// A context-sensitive PFG node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CsPointer {
    /// A local variable under a context.
    Var(Context, Var),
    /// A static field — shared across all contexts.
    StaticField(FieldRef),
    /// An instance field of a context-sensitive heap object.
    InstanceField(CsObj, Arc<str>),
    /// The array-element pseudo-field of a context-sensitive heap object.
    ArrayIndex(CsObj),
}

impl std::fmt::Display for CsPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(ctx, v) => write!(f, "{ctx}:{v}"),
            Self::StaticField(field) => write!(f, "{field}"),
            Self::InstanceField((ctx, obj), name) => write!(f, "{ctx}:{obj}.{name}"),
            Self::ArrayIndex((ctx, obj)) => write!(f, "{ctx}:{obj}[*]"),
        }
    }
}
