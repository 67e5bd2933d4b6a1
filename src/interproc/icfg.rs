//! The Interprocedural Control-Flow Graph (ICFG, §4.8): every reachable method's [`Cfg`] spliced
//! together at call sites, following CHA resolution (mirrors [`crate::callgraph::build`]'s
//! reachability walk).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::CallGraphError;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CfgNode, InvokeKind, Program, Stmt};
use crate::refs::MethodRef;

/// One node of the ICFG: a statement (or the virtual entry/exit) of a specific method.
pub type IcfgNode = (MethodRef, CfgNode);

/// The kind of an ICFG edge (§4.8), determining which `transferEdge` rule applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    /// An ordinary intraprocedural control-flow edge.
    Normal,
    /// From a call statement to the resolved callee's entry.
    Call,
    /// From a resolved callee's exit back to the caller's post-call node. Carries the
    /// originating call node, since the exit node alone does not name which call site to
    /// resolve the callsite's LHS/return binding against.
    Return { call_node: IcfgNode },
    /// From a call statement directly to its own post-call node (the intraprocedural successor
    /// unchanged by the call).
    CallToReturn,
}

/// The interprocedural control-flow graph (§4.8): nodes and edges across every method reachable
/// (by CHA) from the designated entry.
#[derive(Debug, Clone)]
pub struct Icfg {
    entry: IcfgNode,
    nodes: BTreeSet<IcfgNode>,
    succs: BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>>,
    preds: BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>>,
}

impl Icfg {
    /// Builds the ICFG reachable (by CHA) from `entry`.
    pub fn build(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodRef) -> Result<Self, CallGraphError> {
        let mut nodes = BTreeSet::new();
        let mut succs: BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>> = BTreeMap::new();
        let mut preds: BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>> = BTreeMap::new();
        let mut visited: BTreeSet<MethodRef> = BTreeSet::new();
        let mut queue: VecDeque<MethodRef> = VecDeque::new();
        queue.push_back(entry.clone());
        visited.insert(entry.clone());

        let mut link = |succs: &mut BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>>,
                         preds: &mut BTreeMap<IcfgNode, Vec<(IcfgNode, IcfgEdgeKind)>>,
                         from: IcfgNode,
                         to: IcfgNode,
                         kind: IcfgEdgeKind| {
            succs.entry(from.clone()).or_default().push((to.clone(), kind.clone()));
            preds.entry(to).or_default().push((from, kind));
        };

        while let Some(m) = queue.pop_front() {
            let Some(method) = program.method(&m) else {
                return Err(CallGraphError::UndeclaredMethod(m));
            };
            let cfg = method.cfg();
            for node in cfg.nodes() {
                nodes.insert((m.clone(), node));
                let invoke_call = match node {
                    CfgNode::Stmt(i) => match method.stmt(i) {
                        Stmt::Invoke { call } => Some(call),
                        _ => None,
                    },
                    _ => None,
                };

                let Some(call) = invoke_call else {
                    for s in cfg.succs_of(node) {
                        link(&mut succs, &mut preds, (m.clone(), node), (m.clone(), s), IcfgEdgeKind::Normal);
                    }
                    continue;
                };

                let call_node: IcfgNode = (m.clone(), node);
                let targets = resolve(call.kind, &call.method, hierarchy);
                let continuations: Vec<CfgNode> = cfg.succs_of(node).collect();

                for target in &targets {
                    link(&mut succs, &mut preds, call_node.clone(), (target.clone(), CfgNode::Entry), IcfgEdgeKind::Call);
                    for &s in &continuations {
                        link(
                            &mut succs,
                            &mut preds,
                            (target.clone(), CfgNode::Exit),
                            (m.clone(), s),
                            IcfgEdgeKind::Return { call_node: call_node.clone() },
                        );
                    }
                    if visited.insert(target.clone()) {
                        queue.push_back(target.clone());
                    }
                }
                for &s in &continuations {
                    link(&mut succs, &mut preds, call_node.clone(), (m.clone(), s), IcfgEdgeKind::CallToReturn);
                }
            }
        }

        Ok(Self { entry: (entry.clone(), CfgNode::Entry), nodes, succs, preds })
    }

    /// The designated overall entry node (`(entry method, Entry)`).
    #[must_use]
    pub fn entry(&self) -> &IcfgNode {
        &self.entry
    }

    /// Every node discovered, in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = &IcfgNode> {
        self.nodes.iter()
    }

    /// The in-edges of `node`, as `(predecessor, edge kind)` pairs.
    #[must_use]
    pub fn preds_of(&self, node: &IcfgNode) -> &[(IcfgNode, IcfgEdgeKind)] {
        self.preds.get(node).map_or(&[], Vec::as_slice)
    }

    /// The out-edges of `node`, as `(successor, edge kind)` pairs.
    #[must_use]
    pub fn succs_of(&self, node: &IcfgNode) -> &[(IcfgNode, IcfgEdgeKind)] {
        self.succs.get(node).map_or(&[], Vec::as_slice)
    }
}

/// CHA resolution, mirroring [`crate::callgraph`]'s private `resolve` (duplicated rather than
/// exposed, since the two call graphs serve different node shapes).
fn resolve(kind: InvokeKind, declared: &MethodRef, hierarchy: &ClassHierarchy) -> Vec<MethodRef> {
    match kind {
        InvokeKind::Static => vec![declared.clone()],
        InvokeKind::Special => hierarchy.dispatch(&declared.owner, &declared.subsignature()).into_iter().collect(),
        InvokeKind::Virtual | InvokeKind::Interface => {
            let closure = hierarchy.subtype_closure(&declared.owner);
            let subsig = declared.subsignature();
            let targets: BTreeSet<MethodRef> = closure.iter().filter_map(|c| hierarchy.dispatch(c, &subsig)).collect();
            targets.into_iter().collect()
        }
    }
}
