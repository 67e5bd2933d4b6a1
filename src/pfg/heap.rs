//! Abstract heap objects and the heap model (`HeapModel`, §6): canonical per-allocation-site
//! objects, identified by the `New` statement that creates them.

use crate::refs::{ClassRef, MethodRef};

/// An abstract heap object, canonical per allocation site: the method and statement index of
/// the `New` that creates it, plus the allocated class (consulted by virtual dispatch on the
/// object's dynamic type, §4.5's `processCall`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapObj {
    site_method: MethodRef,
    site_index: usize,
    class: ClassRef,
}

impl HeapObj {
    /// Creates the canonical object for the allocation site at `(site_method, site_index)`.
    #[must_use]
    pub fn new(site_method: MethodRef, site_index: usize, class: ClassRef) -> Self {
        Self { site_method, site_index, class }
    }

    /// The allocated class — this object's dynamic type for virtual dispatch.
    #[must_use]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }
}

impl std::fmt::Display for HeapObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.class, self.site_method, self.site_index)
    }
}

/// The context-insensitive heap model (§6's `HeapModel`): `getObj(newStmt)` is just
/// [`HeapObj::new`] applied to the allocation site, since there is only one abstraction per
/// site in the context-insensitive solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapModel;

impl HeapModel {
    /// The canonical object allocated by the `New` statement at `(method, stmt_index)`.
    #[must_use]
    pub fn obj_of(&self, method: &MethodRef, stmt_index: usize, class: &ClassRef) -> HeapObj {
        HeapObj::new(method.clone(), stmt_index, class.clone())
    }
}
