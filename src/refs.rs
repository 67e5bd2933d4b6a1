//! Lightweight, hash-interned references to program elements.
//!
//! These play the role that `jvm::references::ClassRef`/`MethodRef`/`FieldRef` play in
//! a bytecode-oriented library: a cheap, `Clone`-able identity that can be compared and hashed
//! without dereferencing into the declaring class.

use std::sync::Arc;

/// A reference to a class or interface, identified by its fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{name}")]
pub struct ClassRef {
    name: Arc<str>,
}

impl ClassRef {
    /// Creates a new reference to the class or interface named `name`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The fully qualified name of the referenced class or interface.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A reference to a method, identified by its declaring class and subsignature
/// (`name` + arity; this crate does not model overload resolution by parameter type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{owner}::{name}")]
pub struct MethodRef {
    /// The class or interface declaring the method.
    pub owner: ClassRef,
    /// The method's simple name.
    pub name: Arc<str>,
    /// The number of declared parameters, excluding an implicit receiver.
    pub arity: usize,
}

impl MethodRef {
    /// Creates a new method reference.
    pub fn new(owner: ClassRef, name: impl Into<Arc<str>>, arity: usize) -> Self {
        Self {
            owner,
            name: name.into(),
            arity,
        }
    }

    /// The subsignature (`name` + arity) used to match overriding methods during dispatch.
    #[must_use]
    pub fn subsignature(&self) -> (Arc<str>, usize) {
        (Arc::clone(&self.name), self.arity)
    }
}

/// A reference to a field, identified by its declaring class and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{owner}.{name}")]
pub struct FieldRef {
    /// The class declaring the field.
    pub owner: ClassRef,
    /// The field's name.
    pub name: Arc<str>,
}

impl FieldRef {
    /// Creates a new field reference.
    pub fn new(owner: ClassRef, name: impl Into<Arc<str>>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ref_equality_is_by_name() {
        assert_eq!(ClassRef::new("java.lang.Object"), ClassRef::new("java.lang.Object"));
        assert_ne!(ClassRef::new("A"), ClassRef::new("B"));
    }

    #[test]
    fn method_ref_subsignature_ignores_owner() {
        let a = MethodRef::new(ClassRef::new("A"), "m", 1);
        let b = MethodRef::new(ClassRef::new("B"), "m", 1);
        assert_eq!(a.subsignature(), b.subsignature());
    }
}
