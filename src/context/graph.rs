//! The context-sensitive Pointer Flow Graph: [`crate::pfg::PointerFlowGraph`]'s arena-indexed
//! shape, over [`CsPointer`] nodes.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::pointer::CsPointer;

/// The context-sensitive PFG. Nodes and edges are only ever added (§3's monotonic lifecycle).
#[derive(Debug, Clone, Default)]
pub struct CsPointerFlowGraph {
    graph: DiGraph<CsPointer, ()>,
    index_of: BTreeMap<CsPointer, NodeIndex>,
}

impl CsPointerFlowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_of(&mut self, ptr: &CsPointer) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(ptr) {
            return idx;
        }
        let idx = self.graph.add_node(ptr.clone());
        self.index_of.insert(ptr.clone(), idx);
        idx
    }

    /// Adds an edge `from -> to`, if not already present. Returns whether the edge is new.
    pub fn add_edge(&mut self, from: &CsPointer, to: &CsPointer) -> bool {
        let f = self.node_of(from);
        let t = self.node_of(to);
        if self.graph.find_edge(f, t).is_some() {
            return false;
        }
        self.graph.add_edge(f, t, ());
        true
    }

    /// The direct PFG successors of `ptr`, in deterministic order.
    #[must_use]
    pub fn successors_of(&self, ptr: &CsPointer) -> Vec<CsPointer> {
        let Some(&idx) = self.index_of.get(ptr) else {
            return Vec::new();
        };
        let mut out: Vec<CsPointer> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::ir::{PrimitiveType, Var};
    use crate::refs::{ClassRef, MethodRef};

    fn var(ctx: &Context, name: &str) -> CsPointer {
        CsPointer::Var(ctx.clone(), Var::new(MethodRef::new(ClassRef::new("T"), "m", 0), name, PrimitiveType::Reference))
    }

    #[test]
    fn edge_insertion_is_idempotent() {
        let ctx = Context::empty();
        let mut pfg = CsPointerFlowGraph::new();
        assert!(pfg.add_edge(&var(&ctx, "y"), &var(&ctx, "x")));
        assert!(!pfg.add_edge(&var(&ctx, "y"), &var(&ctx, "x")));
        assert_eq!(pfg.successors_of(&var(&ctx, "y")), vec![var(&ctx, "x")]);
    }
}
