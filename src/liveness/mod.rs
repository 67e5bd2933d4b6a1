//! Live-variable analysis and the dead-code detector fused with constant propagation (C4, §4.3).

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::constprop::eval::{eval_operand, evaluate};
use crate::dataflow::{Analysis, DataflowResult};
use crate::ir::{CfgNode, EdgeKind, Method, Stmt};
use crate::lattice::{CPFact, SetFact, Value};

/// Live-variable analysis (§4.3): backward, meet = union, boundary (at exit) = the empty set.
#[derive(Debug, Default)]
pub struct LiveVariables;

impl LiveVariables {
    /// Creates the analysis.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Analysis for LiveVariables {
    type Fact = SetFact<crate::ir::Var>;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _method: &Method) -> Self::Fact {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> Self::Fact {
        SetFact::new()
    }

    fn meet_into(&self, src: &Self::Fact, target: &mut Self::Fact) -> bool {
        target.union(src)
    }

    fn transfer_node(&self, method: &Method, node: CfgNode, upstream: &Self::Fact, downstream: &mut Self::Fact) -> bool {
        let CfgNode::Stmt(index) = node else {
            let changed = *upstream != *downstream;
            downstream.copy_from(upstream);
            return changed;
        };
        let stmt = method.stmt(index);
        let mut next = upstream.clone();
        if let Some(def) = stmt.def() {
            next.remove(&def);
        }
        for used in stmt.uses() {
            next.add(used);
        }
        let changed = next != *downstream;
        downstream.copy_from(&next);
        changed
    }
}

/// Evaluates an `If`/`Switch` condition against a constant-propagation fact to determine which
/// out-edges are feasible (§4.3). Returns `None` when every edge should be treated as feasible
/// (the condition did not resolve to a known constant).
fn feasible_edge_kinds(stmt: &Stmt, in_fact: &CPFact) -> Option<HashSet<EdgeKind>> {
    match stmt {
        Stmt::If { cond, .. } => match eval_operand(cond, in_fact) {
            Value::Const(k) => Some(HashSet::from([if k != 0 { EdgeKind::IfTrue } else { EdgeKind::IfFalse }])),
            _ => None,
        },
        Stmt::Switch { var, cases, .. } => match in_fact.get(var) {
            Value::Const(k) => {
                let matched = cases.iter().any(|&(case, _)| case == k);
                let kind = if matched { EdgeKind::SwitchCase(k) } else { EdgeKind::SwitchDefault };
                Some(HashSet::from([kind]))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Computes the dead-code set (§4.3): a traversal from the entry that respects constant-driven
/// branch feasibility, fused with a useless-assignment check against the live-variable result.
/// Returns dead statement indices in ascending order.
#[must_use]
pub fn dead_code(method: &Method, cp: &DataflowResult<CPFact>, live: &DataflowResult<SetFact<crate::ir::Var>>) -> Vec<usize> {
    let cfg = method.cfg();
    let mut visited: BTreeSet<CfgNode> = BTreeSet::new();
    let mut queue: VecDeque<CfgNode> = VecDeque::new();
    queue.push_back(cfg.entry());
    visited.insert(cfg.entry());

    while let Some(node) = queue.pop_front() {
        let feasible = match node {
            CfgNode::Stmt(index) => feasible_edge_kinds(method.stmt(index), cp.get_in_fact(node)),
            CfgNode::Entry | CfgNode::Exit => None,
        };
        for (succ, kind) in cfg.out_edges(node) {
            if feasible.as_ref().is_some_and(|kinds| !kinds.contains(&kind)) {
                continue;
            }
            if visited.insert(succ) {
                queue.push_back(succ);
            }
        }
    }

    let mut reachable: BTreeSet<usize> = visited
        .into_iter()
        .filter_map(|n| match n {
            CfgNode::Stmt(i) => Some(i),
            _ => None,
        })
        .collect();

    let snapshot: Vec<usize> = reachable.iter().copied().collect();
    for index in snapshot {
        let node = CfgNode::Stmt(index);
        let stmt = method.stmt(index);

        // An assignment that can never produce a defined value on any currently-modeled path
        // (the div-by-zero rule of §4.2) is dead regardless of liveness or side effects.
        if let Stmt::Assign { rhs, .. } = stmt {
            if evaluate(rhs, cp.get_in_fact(node)) == Value::Undef {
                reachable.remove(&index);
                continue;
            }
        }

        if let Some(def) = stmt.def() {
            let live_after = live.get_out_fact(node);
            if !live_after.contains(&def) && !stmt.has_potential_side_effect() {
                reachable.remove(&index);
            }
        }
    }

    (0..cfg.stmt_count()).filter(|i| !reachable.contains(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constprop::ConstantPropagation;
    use crate::dataflow::solve;
    use crate::ir::{BinOp, Exp, Operand, PrimitiveType, Var};
    use crate::refs::{ClassRef, MethodRef};

    fn var(name: &str) -> Var {
        Var::new(MethodRef::new(ClassRef::new("T"), "m", 0), name, PrimitiveType::Int)
    }

    #[test]
    fn live_before_first_def_is_empty() {
        // a = 1; b = a + 2; return b;
        let a = var("a");
        let b = var("b");
        let stmts = vec![
            Stmt::Assign { lhs: a.clone(), rhs: Exp::Operand(Operand::IntLiteral(1)) },
            Stmt::Assign {
                lhs: b.clone(),
                rhs: Exp::Binary { op: BinOp::Add, left: Operand::Var(a.clone()), right: Operand::IntLiteral(2) },
            },
            Stmt::Return { var: Some(b.clone()) },
        ];
        let method = Method::new(MethodRef::new(ClassRef::new("T"), "m", 0), None, vec![], stmts);
        let result = solve(&LiveVariables::new(), &method);
        assert!(result.get_in_fact(CfgNode::Stmt(0)).is_empty());
        assert!(result.get_in_fact(CfgNode::Stmt(1)).contains(&a));
        assert!(result.get_in_fact(CfgNode::Stmt(2)).contains(&b));
    }

    #[test]
    fn division_by_zero_is_dead() {
        // x = 0; y = 10 / x; return;
        let x = var("x");
        let y = var("y");
        let stmts = vec![
            Stmt::Assign { lhs: x.clone(), rhs: Exp::Operand(Operand::IntLiteral(0)) },
            Stmt::Assign {
                lhs: y.clone(),
                rhs: Exp::Binary { op: BinOp::Div, left: Operand::IntLiteral(10), right: Operand::Var(x.clone()) },
            },
            Stmt::Return { var: None },
        ];
        let method = Method::new(MethodRef::new(ClassRef::new("T"), "m", 0), None, vec![], stmts);
        let cp = solve(&ConstantPropagation::new(), &method);
        let live = solve(&LiveVariables::new(), &method);
        let dead = dead_code(&method, &cp, &live);
        assert!(dead.contains(&1), "dead set {dead:?} should include the div-by-zero assignment");
    }

    #[test]
    fn useless_assignment_is_dead() {
        // a = 1; return;  (a is never used)
        let a = var("a");
        let stmts = vec![
            Stmt::Assign { lhs: a.clone(), rhs: Exp::Operand(Operand::IntLiteral(1)) },
            Stmt::Return { var: None },
        ];
        let method = Method::new(MethodRef::new(ClassRef::new("T"), "m", 0), None, vec![], stmts);
        let cp = solve(&ConstantPropagation::new(), &method);
        let live = solve(&LiveVariables::new(), &method);
        let dead = dead_code(&method, &cp, &live);
        assert_eq!(dead, vec![0]);
    }
}
