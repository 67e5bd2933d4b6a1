//! Class Hierarchy Analysis (CHA) call-graph construction (C5, §4.4).
//!
//! Grounded on the teacher's arena-indexed graph convention (§9's "Arena-indexed graphs" design
//! note): nodes are dense [`petgraph`] indices, looked up through a `MethodRef → NodeIndex` map.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::CallGraphError;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{InvokeKind, Program, Stmt};
use crate::refs::MethodRef;

/// A CHA-resolved call graph: methods as nodes, call edges from resolved invocations.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<MethodRef, ()>,
    index_of: BTreeMap<MethodRef, NodeIndex>,
    reachable: BTreeSet<MethodRef>,
}

impl CallGraph {
    fn node_of(&mut self, method: &MethodRef) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(method) {
            return idx;
        }
        let idx = self.graph.add_node(method.clone());
        self.index_of.insert(method.clone(), idx);
        idx
    }

    /// Adds a call edge from `caller` to `callee`, inserting either endpoint as a node if new.
    /// Returns whether the edge is new.
    pub fn add_edge(&mut self, caller: &MethodRef, callee: &MethodRef) -> bool {
        let from = self.node_of(caller);
        let to = self.node_of(callee);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Marks `method` reachable. Returns whether it was newly marked.
    pub fn mark_reachable(&mut self, method: &MethodRef) -> bool {
        self.node_of(method);
        self.reachable.insert(method.clone())
    }

    /// Whether `method` has been marked reachable.
    #[must_use]
    pub fn is_reachable(&self, method: &MethodRef) -> bool {
        self.reachable.contains(method)
    }

    /// Every method marked reachable, in identity order.
    pub fn reachable_methods(&self) -> impl Iterator<Item = &MethodRef> {
        self.reachable.iter()
    }

    /// The direct callees of `caller` recorded so far, in identity order.
    #[must_use]
    pub fn callees_of(&self, caller: &MethodRef) -> Vec<MethodRef> {
        let Some(&idx) = self.index_of.get(caller) else {
            return Vec::new();
        };
        let mut callees: Vec<MethodRef> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        callees.sort();
        callees
    }

    /// Every edge in the graph, as `(caller, callee)` pairs in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (MethodRef, MethodRef)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |e| self.graph.edge_endpoints(e))
            .map(move |(from, to)| (self.graph[from].clone(), self.graph[to].clone()))
    }
}

/// Resolves a call site's targets via CHA (§4.4). `STATIC`/`SPECIAL` resolve to exactly the
/// declared or dispatched method (an empty result is a malformed program, see
/// [`CallGraphError::UndeclaredMethod`]); `VIRTUAL`/`INTERFACE` resolve through the subtype
/// closure of the declaring type, tolerating an empty result (no runtime override exists yet).
fn resolve(call_kind: InvokeKind, declared: &MethodRef, hierarchy: &ClassHierarchy) -> Result<Vec<MethodRef>, CallGraphError> {
    match call_kind {
        InvokeKind::Static => Ok(vec![declared.clone()]),
        InvokeKind::Special => hierarchy
            .dispatch(&declared.owner, &declared.subsignature())
            .map(|m| vec![m])
            .ok_or_else(|| CallGraphError::UndeclaredMethod(declared.clone())),
        InvokeKind::Virtual | InvokeKind::Interface => {
            let closure = hierarchy.subtype_closure(&declared.owner);
            let subsig = declared.subsignature();
            let targets: BTreeSet<MethodRef> =
                closure.iter().filter_map(|class| hierarchy.dispatch(class, &subsig)).collect();
            Ok(targets.into_iter().collect())
        }
    }
}

/// Builds the CHA call graph starting from `entry`, following every invocation statement
/// reachable from it (§4.4). No points-to information is consulted.
pub fn build(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodRef) -> Result<CallGraph, CallGraphError> {
    let mut cg = CallGraph::default();
    let mut queue: VecDeque<MethodRef> = VecDeque::new();
    queue.push_back(entry.clone());
    cg.mark_reachable(entry);

    while let Some(caller) = queue.pop_front() {
        let Some(method) = program.method(&caller) else {
            return Err(CallGraphError::UndeclaredMethod(caller));
        };
        for stmt in method.stmts() {
            let Stmt::Invoke { call } = stmt else { continue };
            let targets = resolve(call.kind, &call.method, hierarchy)?;
            log::debug!("cha: {} -> {} resolved {} target(s)", caller, call.method, targets.len());
            for target in targets {
                if cg.add_edge(&caller, &target) {
                    log::debug!("cha: new call edge {caller} -> {target}");
                }
                if cg.mark_reachable(&target) {
                    queue.push_back(target);
                }
            }
        }
    }

    Ok(cg)
}
