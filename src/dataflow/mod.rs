//! The generic monotone dataflow framework (C2, §4.1): an `Analysis` capability set plus a
//! deterministic FIFO worklist fixpoint solver over a single method's [`Cfg`].
//!
//! Grounded on the teacher's `analysis::fixed_point::Analyzer` trait — the same shape (an
//! entry/boundary fact, a per-location transfer, and a `merge_facts`/`meet_into` — drives a
//! `BTreeMap`-backed worklist to a fixpoint), specialized here to the explicit forward/backward,
//! `IN`/`OUT`-per-node contract of §4.1 rather than the teacher's generic `Location`.

use std::collections::{HashSet, VecDeque};

use crate::ir::{Cfg, CfgNode, Method};

/// The capability set a concrete analysis must provide (§4.1).
pub trait Analysis {
    /// The lattice element attached to each CFG node.
    type Fact: Clone + PartialEq;

    /// Whether this analysis runs forward (entry → exit) or backward (exit → entry).
    fn is_forward(&self) -> bool;

    /// The fact installed at the boundary node (`OUT(entry)` for a forward analysis,
    /// `IN(exit)` for a backward one) before the worklist starts. Takes the whole [`Method`]
    /// (not just its [`Cfg`]) so boundary facts can depend on parameters, e.g. constant
    /// propagation's "every int-holding parameter starts as `NAC`" rule.
    fn new_boundary_fact(&self, method: &Method) -> Self::Fact;

    /// The fact every non-boundary node starts at (typically the lattice's bottom).
    fn new_initial_fact(&self) -> Self::Fact;

    /// Meets `src` into `target` in place. Returns whether `target` changed.
    fn meet_into(&self, src: &Self::Fact, target: &mut Self::Fact) -> bool;

    /// The transfer function for a single node. `upstream` is `IN(n)` for a forward analysis
    /// or `OUT(n)` for a backward one; `downstream` is the complementary fact, updated in
    /// place. Returns whether `downstream` changed as a result (§9: compare a snapshot, not
    /// merely "did this function write anything").
    fn transfer_node(&self, method: &Method, node: CfgNode, upstream: &Self::Fact, downstream: &mut Self::Fact) -> bool;
}

/// The result store (§6): `IN`/`OUT` facts for every node of the [`Cfg`] that was solved.
#[derive(Debug, Clone)]
pub struct DataflowResult<F> {
    in_facts: std::collections::BTreeMap<CfgNode, F>,
    out_facts: std::collections::BTreeMap<CfgNode, F>,
}

impl<F> DataflowResult<F> {
    /// The `IN` fact at `node`.
    #[must_use]
    pub fn get_in_fact(&self, node: CfgNode) -> &F {
        &self.in_facts[&node]
    }

    /// The `OUT` fact at `node`.
    #[must_use]
    pub fn get_out_fact(&self, node: CfgNode) -> &F {
        &self.out_facts[&node]
    }
}

/// Solves `analysis` over `method`'s CFG to a fixpoint (§4.1).
///
/// A single FIFO worklist, deduplicated by a membership set, drives both directions: forward
/// recomputes `IN(n)` from predecessors' `OUT` and enqueues successors on change; backward is
/// the literal mirror, recomputing `OUT(n)` from successors' `IN` and enqueuing predecessors.
pub fn solve<A: Analysis>(analysis: &A, method: &Method) -> DataflowResult<A::Fact> {
    let cfg = method.cfg();
    let forward = analysis.is_forward();
    let boundary_node = if forward { cfg.entry() } else { cfg.exit() };

    let mut in_facts = std::collections::BTreeMap::new();
    let mut out_facts = std::collections::BTreeMap::new();
    for node in cfg.nodes() {
        in_facts.insert(node, analysis.new_initial_fact());
        out_facts.insert(node, analysis.new_initial_fact());
    }
    if forward {
        out_facts.insert(boundary_node, analysis.new_boundary_fact(method));
    } else {
        in_facts.insert(boundary_node, analysis.new_boundary_fact(method));
    }

    let mut queue: VecDeque<CfgNode> = VecDeque::new();
    let mut queued: HashSet<CfgNode> = HashSet::new();
    for node in cfg.nodes() {
        if node != boundary_node && queued.insert(node) {
            queue.push_back(node);
        }
    }

    while let Some(n) = queue.pop_front() {
        queued.remove(&n);

        let preds: Vec<CfgNode> = if forward { cfg.preds_of(n).collect() } else { cfg.succs_of(n).collect() };
        let mut merged = analysis.new_initial_fact();
        for p in preds {
            let src = if forward { &out_facts[&p] } else { &in_facts[&p] };
            analysis.meet_into(src, &mut merged);
        }
        if forward {
            in_facts.insert(n, merged);
        } else {
            out_facts.insert(n, merged);
        }

        let upstream = if forward { in_facts[&n].clone() } else { out_facts[&n].clone() };
        let downstream_store = if forward { &mut out_facts } else { &mut in_facts };
        let mut downstream = downstream_store[&n].clone();
        let changed = analysis.transfer_node(method, n, &upstream, &mut downstream);
        downstream_store.insert(n, downstream);

        if changed {
            let succs: Vec<CfgNode> = if forward { cfg.succs_of(n).collect() } else { cfg.preds_of(n).collect() };
            for s in succs {
                if s != boundary_node && queued.insert(s) {
                    queue.push_back(s);
                }
            }
        }
        log::trace!("dataflow worklist: processed {n:?}, enqueued more: {changed}");
    }

    DataflowResult { in_facts, out_facts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Stmt;
    use crate::lattice::SetFact;
    use crate::refs::{ClassRef, MethodRef};

    /// A trivial forward analysis tracking "has this node been visited" as a growing integer
    /// set, used only to exercise the solver's plumbing (direction, boundary, worklist).
    struct ReachabilityProbe;

    impl Analysis for ReachabilityProbe {
        type Fact = SetFact<usize>;

        fn is_forward(&self) -> bool {
            true
        }

        fn new_boundary_fact(&self, _method: &Method) -> Self::Fact {
            let mut f = SetFact::new();
            f.add(0);
            f
        }

        fn new_initial_fact(&self) -> Self::Fact {
            SetFact::new()
        }

        fn meet_into(&self, src: &Self::Fact, target: &mut Self::Fact) -> bool {
            target.union(src)
        }

        fn transfer_node(&self, _method: &Method, node: CfgNode, upstream: &Self::Fact, downstream: &mut Self::Fact) -> bool {
            let mut next = upstream.clone();
            if let CfgNode::Stmt(i) = node {
                next.add(i + 1);
            }
            let changed = next != *downstream;
            *downstream = next;
            changed
        }
    }

    #[test]
    fn forward_solve_reaches_every_node() {
        let id = MethodRef::new(ClassRef::new("T"), "m", 0);
        let stmts = vec![Stmt::Nop, Stmt::Nop, Stmt::Return { var: None }];
        let method = Method::new(id, None, vec![], stmts);
        let result = solve(&ReachabilityProbe, &method);
        assert!(!result.get_out_fact(CfgNode::Stmt(2)).is_empty());
    }
}
