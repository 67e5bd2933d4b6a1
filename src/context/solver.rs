//! The context-sensitive pointer-analysis fixpoint (C7, §4.6): identical structure to the
//! context-insensitive solver (C6, §4.5), but every pointer, heap object, and call-graph node is
//! additionally keyed by a [`Context`] produced by a [`ContextSelector`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};

use super::graph::CsPointerFlowGraph;
use super::pointer::{CsObj, CsPointer};
use super::selector::ContextSelector;
use super::Context;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallSite, FieldAccess, InvokeKind, Operand, Program, Stmt, Var};
use crate::lattice::PointsToSet;
use crate::pfg::HeapObj;
use crate::refs::MethodRef;
use crate::taint::{position_var, Position, TaintConfig, TaintFlow, TaintObj, TaintResult, TaintSinkHit};

type CsMethod = (Context, MethodRef);
type CsVar = (Context, Var);

#[derive(Debug, Clone, Default)]
struct InstanceSites {
    store_fields: BTreeMap<CsVar, Vec<(Arc<str>, Operand)>>,
    load_fields: BTreeMap<CsVar, Vec<(Arc<str>, Var)>>,
    store_arrays: BTreeMap<CsVar, Vec<Operand>>,
    load_arrays: BTreeMap<CsVar, Vec<Var>>,
    invokes: BTreeMap<CsVar, Vec<(Context, MethodRef, usize, CallSite)>>,
}

/// A minimal context-sensitive call graph: nodes are `(Context, MethodRef)` pairs, mirroring
/// [`crate::callgraph::CallGraph`]'s arena-indexed shape.
#[derive(Debug, Clone, Default)]
struct CsCallGraph {
    graph: DiGraph<CsMethod, ()>,
    index_of: BTreeMap<CsMethod, NodeIndex>,
    reachable: BTreeSet<CsMethod>,
}

impl CsCallGraph {
    fn node_of(&mut self, method: &CsMethod) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(method) {
            return idx;
        }
        let idx = self.graph.add_node(method.clone());
        self.index_of.insert(method.clone(), idx);
        idx
    }

    fn add_edge(&mut self, caller: &CsMethod, callee: &CsMethod) -> bool {
        let from = self.node_of(caller);
        let to = self.node_of(callee);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    fn mark_reachable(&mut self, method: &CsMethod) -> bool {
        self.node_of(method);
        self.reachable.insert(method.clone())
    }
}

/// The produced interface (§6): frozen context-sensitive points-to sets.
#[derive(Debug, Clone, Default)]
pub struct ContextSensitiveResult {
    pts: BTreeMap<CsPointer, PointsToSet<CsObj>>,
    reachable: BTreeSet<CsMethod>,
}

impl ContextSensitiveResult {
    /// The points-to set of `ptr` (empty if never discovered).
    #[must_use]
    pub fn points_to_set(&self, ptr: &CsPointer) -> PointsToSet<CsObj> {
        self.pts.get(ptr).cloned().unwrap_or_else(PointsToSet::new)
    }

    /// The points-to set of `var` under `ctx`.
    #[must_use]
    pub fn points_to_set_of_var(&self, ctx: &Context, var: &Var) -> PointsToSet<CsObj> {
        self.points_to_set(&CsPointer::Var(ctx.clone(), var.clone()))
    }

    /// Every `(Context, Method)` pair discovered reachable.
    pub fn reachable_methods(&self) -> impl Iterator<Item = &CsMethod> {
        self.reachable.iter()
    }
}

/// The context-sensitive pointer-analysis solver, parameterised by the selector policy `S`
/// (§4.13's `ContextSensitivity` choices map to concrete `S`s).
pub struct ContextSensitiveAnalysis<'p, S> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    selector: S,
    pfg: CsPointerFlowGraph,
    pts: BTreeMap<CsPointer, PointsToSet<CsObj>>,
    call_graph: CsCallGraph,
    sites: InstanceSites,
    worklist: VecDeque<(CsPointer, PointsToSet<CsObj>)>,
    taint_config: Option<&'p TaintConfig>,
    taint: BTreeMap<CsPointer, BTreeSet<TaintObj>>,
    taint_transfer_edges: BTreeMap<CsPointer, Vec<(CsPointer, Arc<str>)>>,
    taint_sinks: Vec<TaintSinkHit>,
    taint_worklist: VecDeque<(CsPointer, BTreeSet<TaintObj>)>,
}

impl<'p, S: ContextSelector> ContextSensitiveAnalysis<'p, S> {
    /// Creates a solver for `program` under selector policy `selector`.
    #[must_use]
    pub fn new(program: &'p Program, hierarchy: &'p ClassHierarchy, selector: S) -> Self {
        Self {
            program,
            hierarchy,
            selector,
            pfg: CsPointerFlowGraph::new(),
            pts: BTreeMap::new(),
            call_graph: CsCallGraph::default(),
            sites: InstanceSites::default(),
            worklist: VecDeque::new(),
            taint_config: None,
            taint: BTreeMap::new(),
            taint_transfer_edges: BTreeMap::new(),
            taint_sinks: Vec::new(),
            taint_worklist: VecDeque::new(),
        }
    }

    /// Runs the fixpoint from `entry` under the selector's empty context.
    #[must_use]
    pub fn solve(mut self, entry: &MethodRef) -> ContextSensitiveResult {
        self.run(entry);
        ContextSensitiveResult { pts: self.pts, reachable: self.call_graph.reachable }
    }

    /// Runs the fixpoint from `entry` with the taint overlay (C8, §4.7) plugged into the same
    /// worklist: taint objects are seeded at source calls and carried along every PFG edge the
    /// points-to fixpoint establishes, with `config`'s transfer rules layered on top.
    #[must_use]
    pub fn solve_with_taint(mut self, entry: &MethodRef, config: &'p TaintConfig) -> (ContextSensitiveResult, TaintResult) {
        self.taint_config = Some(config);
        self.run(entry);
        let taint_result = self.finish_taint();
        let result = ContextSensitiveResult { pts: self.pts, reachable: self.call_graph.reachable };
        (result, taint_result)
    }

    fn run(&mut self, entry: &MethodRef) {
        let empty = self.selector.empty_context();
        self.add_reachable(&empty, entry);
        loop {
            if let Some((ptr, pts)) = self.worklist.pop_front() {
                self.propagate(ptr, pts);
                continue;
            }
            if let Some((ptr, taint)) = self.taint_worklist.pop_front() {
                self.propagate_taint(ptr, taint);
                continue;
            }
            break;
        }
    }

    fn finish_taint(&self) -> TaintResult {
        let mut flows = BTreeSet::new();
        for hit in &self.taint_sinks {
            let Some(set) = self.taint.get(&CsPointer::Var(hit.ctx.clone(), hit.arg_var.clone())) else {
                continue;
            };
            for obj in set {
                flows.insert(TaintFlow {
                    source: obj.provenance(),
                    sink: (hit.caller.clone(), hit.stmt_index),
                    sink_arg_index: hit.sink.arg_index,
                });
            }
        }
        TaintResult::new(flows)
    }

    fn add_pfg_edge_with_propagation(&mut self, from: &CsPointer, to: &CsPointer) {
        if self.pfg.add_edge(from, to) {
            log::trace!("cs-pfg: new edge {from} -> {to}");
            if let Some(existing) = self.pts.get(from).cloned() {
                if !existing.is_empty() {
                    self.worklist.push_back((to.clone(), existing));
                }
            }
            if let Some(existing_taint) = self.taint.get(from).cloned() {
                if !existing_taint.is_empty() {
                    self.taint_worklist.push_back((to.clone(), existing_taint));
                }
            }
        }
    }

    fn propagate_taint(&mut self, ptr: CsPointer, incoming: BTreeSet<TaintObj>) {
        let delta: BTreeSet<TaintObj> = {
            let current = self.taint.entry(ptr.clone()).or_default();
            let delta: BTreeSet<TaintObj> = incoming.difference(current).cloned().collect();
            if delta.is_empty() {
                return;
            }
            current.extend(delta.iter().cloned());
            delta
        };
        log::trace!("taint: {ptr} gained {} object(s)", delta.len());

        for succ in self.pfg.successors_of(&ptr) {
            self.taint_worklist.push_back((succ, delta.clone()));
        }

        if let Some(edges) = self.taint_transfer_edges.get(&ptr).cloned() {
            for (to, ty) in edges {
                let re_minted: BTreeSet<TaintObj> = delta.iter().map(|o| o.re_minted(ty.clone())).collect();
                self.taint_worklist.push_back((to, re_minted));
            }
        }
    }

    fn scan_taint_rules(&mut self, ctx: &Context, caller: &MethodRef, index: usize, call: &CallSite) {
        let Some(config) = self.taint_config else {
            return;
        };
        if let Some(source) = config.source_for(&call.method) {
            if let Some(lhs) = &call.lhs {
                let obj = TaintObj::new(caller.clone(), index, source.ty.clone());
                let mut set = BTreeSet::new();
                set.insert(obj);
                self.taint_worklist.push_back((CsPointer::Var(ctx.clone(), lhs.clone()), set));
            }
        }
        for transfer in config.transfers_for(&call.method) {
            let (Some(from_var), Some(to_var)) = (position_var(call, transfer.from), position_var(call, transfer.to)) else {
                continue;
            };
            let from_ptr = CsPointer::Var(ctx.clone(), from_var);
            let to_ptr = CsPointer::Var(ctx.clone(), to_var);
            self.taint_transfer_edges.entry(from_ptr.clone()).or_default().push((to_ptr.clone(), transfer.ty.clone()));
            if let Some(existing) = self.taint.get(&from_ptr).cloned() {
                if !existing.is_empty() {
                    let re_minted: BTreeSet<TaintObj> = existing.iter().map(|o| o.re_minted(transfer.ty.clone())).collect();
                    self.taint_worklist.push_back((to_ptr, re_minted));
                }
            }
        }
        for sink in config.sinks_for(&call.method) {
            if let Some(arg_var) = position_var(call, Position::Arg(sink.arg_index)) {
                self.taint_sinks.push(TaintSinkHit {
                    ctx: ctx.clone(),
                    caller: caller.clone(),
                    stmt_index: index,
                    sink: sink.clone(),
                    arg_var,
                });
            }
        }
    }

    fn propagate(&mut self, ptr: CsPointer, incoming: PointsToSet<CsObj>) {
        let delta = {
            let current = self.pts.entry(ptr.clone()).or_insert_with(PointsToSet::new);
            let delta = current.difference(&incoming);
            if delta.is_empty() {
                return;
            }
            current.extend(&delta);
            delta
        };
        log::trace!("cs-pfg: {ptr} grew by {} object(s)", delta.len());

        for succ in self.pfg.successors_of(&ptr) {
            self.worklist.push_back((succ, delta.clone()));
        }

        if let CsPointer::Var(ctx, v) = &ptr {
            for obj in delta.iter() {
                self.instance_effect(ctx, v, obj.clone());
            }
        }
    }

    fn instance_effect(&mut self, ctx: &Context, v: &Var, obj: CsObj) {
        let key: CsVar = (ctx.clone(), v.clone());
        if let Some(stores) = self.sites.store_fields.get(&key).cloned() {
            for (name, rhs) in stores {
                if let Operand::Var(y) = rhs {
                    self.add_pfg_edge_with_propagation(
                        &CsPointer::Var(ctx.clone(), y),
                        &CsPointer::InstanceField(obj.clone(), name),
                    );
                }
            }
        }
        if let Some(loads) = self.sites.load_fields.get(&key).cloned() {
            for (name, lhs) in loads {
                self.add_pfg_edge_with_propagation(
                    &CsPointer::InstanceField(obj.clone(), name),
                    &CsPointer::Var(ctx.clone(), lhs),
                );
            }
        }
        if let Some(stores) = self.sites.store_arrays.get(&key).cloned() {
            for rhs in stores {
                if let Operand::Var(y) = rhs {
                    self.add_pfg_edge_with_propagation(&CsPointer::Var(ctx.clone(), y), &CsPointer::ArrayIndex(obj.clone()));
                }
            }
        }
        if let Some(loads) = self.sites.load_arrays.get(&key).cloned() {
            for lhs in loads {
                self.add_pfg_edge_with_propagation(&CsPointer::ArrayIndex(obj.clone()), &CsPointer::Var(ctx.clone(), lhs));
            }
        }
        if let Some(invokes) = self.sites.invokes.get(&key).cloned() {
            for (caller_ctx, caller, call_index, call) in invokes {
                self.process_call(obj.clone(), &caller_ctx, &caller, call_index, &call);
            }
        }
    }

    fn replay_instance_effects_for(&mut self, ctx: &Context, v: &Var) {
        if let Some(existing) = self.pts.get(&CsPointer::Var(ctx.clone(), v.clone())).cloned() {
            for obj in existing.iter().cloned().collect::<Vec<_>>() {
                self.instance_effect(ctx, v, obj);
            }
        }
    }

    fn add_reachable(&mut self, ctx: &Context, method_ref: &MethodRef) {
        if !self.call_graph.mark_reachable(&(ctx.clone(), method_ref.clone())) {
            return;
        }
        log::debug!("cs pointer analysis: {ctx}:{method_ref} reachable");
        let Some(method) = self.program.method(method_ref) else {
            log::warn!("cs pointer analysis: reachable method {method_ref} missing from program");
            return;
        };

        for (index, stmt) in method.stmts().iter().enumerate() {
            match stmt {
                Stmt::New { lhs, class } => {
                    let heap_ctx = self.selector.select_heap_context(ctx, method_ref, index);
                    let obj: CsObj = (heap_ctx, HeapObj::new(method_ref.clone(), index, class.clone()));
                    self.worklist.push_back((CsPointer::Var(ctx.clone(), lhs.clone()), PointsToSet::singleton(obj)));
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge_with_propagation(
                        &CsPointer::Var(ctx.clone(), rhs.clone()),
                        &CsPointer::Var(ctx.clone(), lhs.clone()),
                    );
                }
                Stmt::LoadField { lhs, field: FieldAccess::Static(f) } => {
                    self.add_pfg_edge_with_propagation(&CsPointer::StaticField(f.clone()), &CsPointer::Var(ctx.clone(), lhs.clone()));
                }
                Stmt::StoreField { field: FieldAccess::Static(f), rhs: Operand::Var(v) } => {
                    self.add_pfg_edge_with_propagation(&CsPointer::Var(ctx.clone(), v.clone()), &CsPointer::StaticField(f.clone()));
                }
                Stmt::StoreField { field: FieldAccess::Instance(base, name), rhs } => {
                    let key: CsVar = (ctx.clone(), base.clone());
                    self.sites.store_fields.entry(key).or_default().push((name.clone(), rhs.clone()));
                    self.replay_instance_effects_for(ctx, base);
                }
                Stmt::LoadField { lhs, field: FieldAccess::Instance(base, name) } => {
                    let key: CsVar = (ctx.clone(), base.clone());
                    self.sites.load_fields.entry(key).or_default().push((name.clone(), lhs.clone()));
                    self.replay_instance_effects_for(ctx, base);
                }
                Stmt::StoreArray { base, rhs, .. } => {
                    let key: CsVar = (ctx.clone(), base.clone());
                    self.sites.store_arrays.entry(key).or_default().push(rhs.clone());
                    self.replay_instance_effects_for(ctx, base);
                }
                Stmt::LoadArray { lhs, base, .. } => {
                    let key: CsVar = (ctx.clone(), base.clone());
                    self.sites.load_arrays.entry(key).or_default().push(lhs.clone());
                    self.replay_instance_effects_for(ctx, base);
                }
                Stmt::Invoke { call } => {
                    self.process_invoke(ctx, method_ref, index, call);
                    self.scan_taint_rules(ctx, method_ref, index, call);
                }
                _ => {}
            }
        }
    }

    fn process_invoke(&mut self, ctx: &Context, caller: &MethodRef, call_index: usize, call: &CallSite) {
        match call.kind {
            InvokeKind::Static => {
                let target = call.method.clone();
                let callee_ctx = self.selector.select_context(ctx, caller, call_index, call, &target);
                self.dispatch_static_like(ctx, caller, call_index, call, &target, callee_ctx);
            }
            InvokeKind::Special => match self.hierarchy.dispatch(&call.method.owner, &call.method.subsignature()) {
                Some(target) => {
                    let callee_ctx = self.selector.select_context(ctx, caller, call_index, call, &target);
                    self.dispatch_static_like(ctx, caller, call_index, call, &target, callee_ctx);
                }
                None => log::warn!("cs pointer analysis: unresolved special callee {}", call.method),
            },
            InvokeKind::Virtual | InvokeKind::Interface => {
                let Some(recv) = &call.receiver else {
                    log::warn!("cs pointer analysis: virtual/interface call with no receiver in {caller}");
                    return;
                };
                let recv = recv.clone();
                let key: CsVar = (ctx.clone(), recv.clone());
                self.sites.invokes.entry(key).or_default().push((ctx.clone(), caller.clone(), call_index, call.clone()));
                if let Some(existing) = self.pts.get(&CsPointer::Var(ctx.clone(), recv)).cloned() {
                    for obj in existing.iter().cloned().collect::<Vec<_>>() {
                        self.process_call(obj, ctx, caller, call_index, call);
                    }
                }
            }
        }
    }

    fn dispatch_static_like(&mut self, ctx: &Context, caller: &MethodRef, call_index: usize, call: &CallSite, target: &MethodRef, callee_ctx: Context) {
        self.call_graph.add_edge(&(ctx.clone(), caller.clone()), &(callee_ctx.clone(), target.clone()));
        self.add_reachable(&callee_ctx, target);
        let Some(callee) = self.program.method(target) else {
            log::warn!("cs pointer analysis: resolved callee {target} missing from program");
            return;
        };
        if let (Some(recv), Some(this_param)) = (&call.receiver, callee.this().cloned()) {
            self.add_pfg_edge_with_propagation(
                &CsPointer::Var(ctx.clone(), recv.clone()),
                &CsPointer::Var(callee_ctx.clone(), this_param),
            );
        }
        let params = callee.params().to_vec();
        let return_vars = callee.return_vars();
        self.connect_args_and_return(ctx, call, &callee_ctx, &params, &return_vars);
        let _ = call_index;
    }

    fn process_call(&mut self, obj: CsObj, ctx: &Context, caller: &MethodRef, call_index: usize, call: &CallSite) {
        let Some(target) = self.hierarchy.dispatch(obj.1.class(), &call.method.subsignature()) else {
            log::warn!("cs pointer analysis: unresolved virtual callee for {} on {}", call.method, obj.1);
            return;
        };
        let callee_ctx = self.selector.select_context_virtual(ctx, caller, call_index, call, &obj, &target);
        self.call_graph.add_edge(&(ctx.clone(), caller.clone()), &(callee_ctx.clone(), target.clone()));
        self.add_reachable(&callee_ctx, &target);
        let Some(callee) = self.program.method(&target) else {
            log::warn!("cs pointer analysis: resolved callee {target} missing from program");
            return;
        };
        if let Some(this_param) = callee.this().cloned() {
            self.worklist.push_back((CsPointer::Var(callee_ctx.clone(), this_param), PointsToSet::singleton(obj)));
        }
        let params = callee.params().to_vec();
        let return_vars = callee.return_vars();
        self.connect_args_and_return(ctx, call, &callee_ctx, &params, &return_vars);
    }

    fn connect_args_and_return(&mut self, caller_ctx: &Context, call: &CallSite, callee_ctx: &Context, params: &[Var], return_vars: &[Var]) {
        for (arg, param) in call.args.iter().zip(params) {
            if param.is_int_holding() {
                continue;
            }
            if let Operand::Var(a) = arg {
                self.add_pfg_edge_with_propagation(
                    &CsPointer::Var(caller_ctx.clone(), a.clone()),
                    &CsPointer::Var(callee_ctx.clone(), param.clone()),
                );
            }
        }
        if let Some(lhs) = &call.lhs {
            for ret in return_vars {
                self.add_pfg_edge_with_propagation(
                    &CsPointer::Var(callee_ctx.clone(), ret.clone()),
                    &CsPointer::Var(caller_ctx.clone(), lhs.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Insensitive;
    use crate::ir::{Method, PrimitiveType};
    use crate::refs::ClassRef;

    fn rvar(owner: &MethodRef, name: &str) -> Var {
        Var::new(owner.clone(), name, PrimitiveType::Reference)
    }

    #[test]
    fn insensitive_selector_matches_context_insensitive_shape() {
        let hierarchy = ClassHierarchy::new();
        let m = MethodRef::new(ClassRef::new("Main"), "run", 0);
        let x = rvar(&m, "x");
        let y = rvar(&m, "y");
        let stmts = vec![
            Stmt::New { lhs: x.clone(), class: ClassRef::new("T1") },
            Stmt::New { lhs: y.clone(), class: ClassRef::new("T2") },
            Stmt::Copy { lhs: x.clone(), rhs: y.clone() },
        ];
        let mut program = Program::new();
        program.add_method(Method::new(m.clone(), None, vec![], stmts));

        let result = ContextSensitiveAnalysis::new(&program, &hierarchy, Insensitive).solve(&m);
        let empty = Context::empty();
        assert_eq!(result.points_to_set_of_var(&empty, &x).len(), 2);
        assert_eq!(result.points_to_set_of_var(&empty, &y).len(), 1);
    }
}
