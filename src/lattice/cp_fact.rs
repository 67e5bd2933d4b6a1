//! `CPFact`: a map from variable to [`Value`] where an absent key denotes `UNDEF` (§3).

use std::collections::BTreeMap;

use super::value::Value;
use crate::ir::Var;

/// A constant-propagation fact: `Var → Value`, with the invariant that a missing key means
/// `UNDEF`. Facts are never pruned back to remove keys whose value becomes `UNDEF` again
/// (monotonicity only ever grows information), except via the explicit `remove` used by the
/// "kill" half of a transfer function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CPFact {
    values: BTreeMap<Var, Value>,
}

impl CPFact {
    /// An empty fact (every variable is `UNDEF`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value bound to `var`, or `UNDEF` if unbound.
    #[must_use]
    pub fn get(&self, var: &Var) -> Value {
        self.values.get(var).copied().unwrap_or(Value::Undef)
    }

    /// Binds `var` to `value`. Returns whether the binding changed the fact.
    pub fn update(&mut self, var: Var, value: Value) -> bool {
        if value == Value::Undef {
            return self.values.remove(&var).is_some_and(|old| old != Value::Undef);
        }
        let old = self.values.insert(var, value);
        old != Some(value)
    }

    /// Removes any binding for `var` (reverting it to `UNDEF`). Returns whether a binding was
    /// present.
    pub fn remove(&mut self, var: &Var) -> bool {
        self.values.remove(var).is_some()
    }

    /// Iterates over every explicitly bound `(Var, Value)` pair. Variables with no entry are
    /// `UNDEF` and are not yielded.
    pub fn entries(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.values.iter()
    }

    /// Overwrites `self` with a full copy of `other`. Returns whether anything changed.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        let changed = self.values != other.values;
        self.values.clone_from(&other.values);
        changed
    }

    /// Meets `other` into `self` in place (pointwise lattice meet over every variable bound in
    /// either fact). Returns whether `self` changed.
    pub fn meet_into(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (var, &val) in &other.values {
            let current = self.get(var);
            let merged = current.meet(val);
            if merged != current {
                self.values.insert(var.clone(), merged);
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimitiveType;
    use crate::refs::{ClassRef, MethodRef};

    fn var(name: &str) -> Var {
        Var::new(MethodRef::new(ClassRef::new("T"), "m", 0), name, PrimitiveType::Int)
    }

    #[test]
    fn absent_key_is_undef() {
        let fact = CPFact::new();
        assert_eq!(fact.get(&var("x")), Value::Undef);
    }

    #[test]
    fn update_reports_change() {
        let mut fact = CPFact::new();
        assert!(fact.update(var("x"), Value::Const(1)));
        assert!(!fact.update(var("x"), Value::Const(1)));
        assert!(fact.update(var("x"), Value::Nac));
    }

    #[test]
    fn meet_into_is_pointwise() {
        let mut a = CPFact::new();
        a.update(var("x"), Value::Const(1));
        let mut b = CPFact::new();
        b.update(var("x"), Value::Const(2));
        b.update(var("y"), Value::Const(5));
        assert!(a.meet_into(&b));
        assert_eq!(a.get(&var("x")), Value::Nac);
        assert_eq!(a.get(&var("y")), Value::Const(5));
    }

    #[test]
    fn update_to_undef_removes_binding() {
        let mut fact = CPFact::new();
        fact.update(var("x"), Value::Const(1));
        assert!(fact.update(var("x"), Value::Undef));
        assert_eq!(fact.get(&var("x")), Value::Undef);
        assert_eq!(fact.entries().count(), 0);
    }
}
