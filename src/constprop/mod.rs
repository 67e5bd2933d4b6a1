//! Intraprocedural constant propagation (C3, §4.2): a forward [`Analysis`] over [`CPFact`],
//! backed by the bit-exact evaluator in [`eval`].

pub mod eval;

use crate::dataflow::Analysis;
use crate::ir::{CfgNode, Method, Stmt, Var};
use crate::lattice::{CPFact, Value};

/// Constant propagation (§4.2): every int-holding parameter enters the method as `NAC`
/// (the caller's actual argument is unknown), `Assign` evaluates its right-hand side and
/// updates the left-hand side, and every other statement kind is an identity transfer.
#[derive(Debug, Default)]
pub struct ConstantPropagation;

impl ConstantPropagation {
    /// Creates the analysis. Stateless: all context lives in the [`Method`] passed to each call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Analysis for ConstantPropagation {
    type Fact = CPFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn new_boundary_fact(&self, method: &Method) -> Self::Fact {
        let mut fact = CPFact::new();
        for param in method.int_holding_params() {
            fact.update(param.clone(), Value::Nac);
        }
        fact
    }

    fn new_initial_fact(&self) -> Self::Fact {
        CPFact::new()
    }

    fn meet_into(&self, src: &Self::Fact, target: &mut Self::Fact) -> bool {
        target.meet_into(src)
    }

    fn transfer_node(&self, method: &Method, node: CfgNode, upstream: &Self::Fact, downstream: &mut Self::Fact) -> bool {
        let Some(index) = stmt_index(node) else {
            // `Exit`: a pure pass-through, no statement to transfer over.
            return downstream.copy_from(upstream);
        };

        match method.stmt(index) {
            Stmt::Assign { lhs, rhs } if lhs.is_int_holding() => {
                let mut next = upstream.clone();
                let value = eval::evaluate(rhs, upstream);
                next.update(lhs.clone(), value);
                downstream.copy_from(&next)
            }
            _ => downstream.copy_from(upstream),
        }
    }
}

fn stmt_index(node: CfgNode) -> Option<usize> {
    match node {
        CfgNode::Stmt(i) => Some(i),
        CfgNode::Entry | CfgNode::Exit => None,
    }
}

/// Looks up the propagated value of `var` at a node's `IN` fact, a convenience for callers (the
/// dead-code detector, tests) that only care about one variable.
#[must_use]
pub fn value_of(fact: &CPFact, var: &Var) -> Value {
    fact.get(var)
}
