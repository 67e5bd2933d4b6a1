//! The Pointer Flow Graph (§3, §9's "Arena-indexed graphs"): a dense, monotonic directed graph
//! over [`Pointer`] nodes, edges meaning "objects flow from source to target."

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::pointer::Pointer;

/// The Pointer Flow Graph. Nodes and edges are only ever added, never removed (§3's monotonic
/// lifecycle).
#[derive(Debug, Clone, Default)]
pub struct PointerFlowGraph {
    graph: DiGraph<Pointer, ()>,
    index_of: BTreeMap<Pointer, NodeIndex>,
}

impl PointerFlowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_of(&mut self, ptr: &Pointer) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(ptr) {
            return idx;
        }
        let idx = self.graph.add_node(ptr.clone());
        self.index_of.insert(ptr.clone(), idx);
        idx
    }

    /// Adds an edge `from -> to`, if not already present. Returns whether the edge is new.
    pub fn add_edge(&mut self, from: &Pointer, to: &Pointer) -> bool {
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
    pub fn successors_of(&self, ptr: &Pointer) -> Vec<Pointer> {
        let Some(&idx) = self.index_of.get(ptr) else {
            return Vec::new();
        };
        let mut out: Vec<Pointer> = self
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
    use crate::ir::{PrimitiveType, Var};
    use crate::refs::{ClassRef, MethodRef};

    fn var(name: &str) -> Pointer {
        Pointer::Var(Var::new(MethodRef::new(ClassRef::new("T"), "m", 0), name, PrimitiveType::Reference))
    }

    #[test]
    fn edge_insertion_is_idempotent() {
        let mut pfg = PointerFlowGraph::new();
        assert!(pfg.add_edge(&var("y"), &var("x")));
        assert!(!pfg.add_edge(&var("y"), &var("x")));
        assert_eq!(pfg.successors_of(&var("y")), vec![var("x")]);
    }
}
