//! Abstract contexts and the context-sensitive pointer solver built on them (C7, §4.6).

pub mod graph;
pub mod pointer;
pub mod selector;
pub mod solver;

use std::sync::Arc;

use crate::pfg::HeapObj;
use crate::refs::MethodRef;

pub use pointer::{CsObj, CsPointer};
pub use selector::{CallSiteSensitive, ContextSelector, Insensitive, ObjectSensitive};
pub use solver::{ContextSensitiveAnalysis, ContextSensitiveResult};

/// One site a context remembers: the call site that entered the current method (call-site
/// sensitivity), or a receiver object (object sensitivity) — §9's "Context as a value key".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextElem {
    /// A call site, identified by its owning method and statement index.
    CallSite(MethodRef, usize),
    /// A receiver object.
    Obj(HeapObj),
}

/// An abstract context: a bounded, most-recent-first sequence of [`ContextElem`]s, compared only
/// by equality (§3).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Context(Arc<Vec<ContextElem>>);

impl Context {
    /// The empty context (`emptyContext()`, §6) — what the program entry method runs under.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::new(Vec::new()))
    }

    /// This context's elements, most-recent-first.
    #[must_use]
    pub fn elems(&self) -> &[ContextElem] {
        &self.0
    }

    /// Prepends `elem`, truncating to the `k` most recent elements (§9's k-CFA/object-sensitive
    /// truncation). `k = 0` collapses to the empty context, i.e. context-insensitive.
    #[must_use]
    pub fn extended(&self, elem: ContextElem, k: usize) -> Self {
        if k == 0 {
            return Self::empty();
        }
        let mut next = Vec::with_capacity(k.min(self.0.len() + 1));
        next.push(elem);
        next.extend(self.0.iter().take(k - 1).cloned());
        Self(Arc::new(next))
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match e {
                ContextElem::CallSite(m, idx) => write!(f, "{m}:{idx}")?,
                ContextElem::Obj(o) => write!(f, "{o}")?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::ClassRef;

    #[test]
    fn extended_truncates_to_k() {
        let m = MethodRef::new(ClassRef::new("T"), "m", 0);
        let c0 = Context::empty();
        let c1 = c0.extended(ContextElem::CallSite(m.clone(), 0), 2);
        let c2 = c1.extended(ContextElem::CallSite(m.clone(), 1), 2);
        let c3 = c2.extended(ContextElem::CallSite(m, 2), 2);
        assert_eq!(c3.elems().len(), 2);
    }

    #[test]
    fn zero_sensitivity_is_always_empty() {
        let m = MethodRef::new(ClassRef::new("T"), "m", 0);
        let c = Context::empty().extended(ContextElem::CallSite(m, 0), 0);
        assert_eq!(c, Context::empty());
    }
}
