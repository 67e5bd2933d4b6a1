//! Pointers: the four kinds of node a Pointer Flow Graph tracks (§3).

use std::sync::Arc;

use super::heap::HeapObj;
use crate::ir::Var;
use crate::refs::FieldRef;

/// A PFG node. Each variant carries an accumulating points-to set (stored in the solver, not
/// here — a `Pointer` is just an identity).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pointer {
    /// A local variable.
    Var(Var),
    /// A static field, addressed by its declaring class and name.
    StaticField(FieldRef),
    /// An instance field of a specific heap object.
    InstanceField(HeapObj, Arc<str>),
    /// The array-element pseudo-field of a specific heap object (arrays are not indexed
    /// precisely; every index of a given object is abstracted to one pointer).
    ArrayIndex(HeapObj),
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(v) => write!(f, "{v}"),
            Self::StaticField(field) => write!(f, "{field}"),
            Self::InstanceField(obj, name) => write!(f, "{obj}.{name}"),
            Self::ArrayIndex(obj) => write!(f, "{obj}[*]"),
        }
    }
}
