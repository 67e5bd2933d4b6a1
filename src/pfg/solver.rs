//! The context-insensitive pointer-analysis fixpoint (C6, §4.5): on-the-fly reachable-method
//! discovery, PFG construction, and instance-effect expansion over newly-discovered objects.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::graph::PointerFlowGraph;
use super::heap::{HeapModel, HeapObj};
use super::pointer::Pointer;
use crate::callgraph::CallGraph;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallSite, FieldAccess, InvokeKind, Operand, Program, Stmt, Var};
use crate::lattice::PointsToSet;
use crate::refs::MethodRef;

/// Bookkeeping of the per-variable statements an instance-effect expansion must replay whenever
/// that variable's points-to set grows (§4.5's "instance-effect expansion" bullet list).
#[derive(Debug, Clone, Default)]
struct InstanceSites {
    store_fields: BTreeMap<Var, Vec<(Arc<str>, Operand)>>,
    load_fields: BTreeMap<Var, Vec<(Arc<str>, Var)>>,
    store_arrays: BTreeMap<Var, Vec<Operand>>,
    load_arrays: BTreeMap<Var, Vec<Var>>,
    invokes: BTreeMap<Var, Vec<(MethodRef, CallSite)>>,
}

/// The produced interface (§6): the final points-to sets and the on-the-fly call graph.
#[derive(Debug, Clone, Default)]
pub struct PointerAnalysisResult {
    pts: BTreeMap<Pointer, PointsToSet<HeapObj>>,
    call_graph: CallGraph,
}

impl PointerAnalysisResult {
    /// The points-to set of `ptr` (empty if `ptr` was never discovered).
    #[must_use]
    pub fn points_to_set(&self, ptr: &Pointer) -> PointsToSet<HeapObj> {
        self.pts.get(ptr).cloned().unwrap_or_else(PointsToSet::new)
    }

    /// The points-to set of variable `var` (empty if never discovered).
    #[must_use]
    pub fn points_to_set_of_var(&self, var: &Var) -> PointsToSet<HeapObj> {
        self.points_to_set(&Pointer::Var(var.clone()))
    }

    /// Every variable with a non-empty points-to set.
    pub fn vars_with_points_to(&self) -> impl Iterator<Item = &Var> {
        self.pts.iter().filter(|(_, pts)| !pts.is_empty()).filter_map(|(p, _)| match p {
            Pointer::Var(v) => Some(v),
            _ => None,
        })
    }

    /// The on-the-fly call graph discovered alongside the points-to fixpoint.
    #[must_use]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }
}

/// The context-insensitive pointer-analysis solver (§4.5).
pub struct PointerAnalysis<'p> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    heap_model: HeapModel,
    pfg: PointerFlowGraph,
    pts: BTreeMap<Pointer, PointsToSet<HeapObj>>,
    call_graph: CallGraph,
    sites: InstanceSites,
    worklist: VecDeque<(Pointer, PointsToSet<HeapObj>)>,
}

impl<'p> PointerAnalysis<'p> {
    /// Creates a solver for `program`, resolving virtual/interface dispatch against `hierarchy`.
    #[must_use]
    pub fn new(program: &'p Program, hierarchy: &'p ClassHierarchy) -> Self {
        Self {
            program,
            hierarchy,
            heap_model: HeapModel,
            pfg: PointerFlowGraph::new(),
            pts: BTreeMap::new(),
            call_graph: CallGraph::default(),
            sites: InstanceSites::default(),
            worklist: VecDeque::new(),
        }
    }

    /// Runs the fixpoint from `entry`, returning the frozen result.
    #[must_use]
    pub fn solve(mut self, entry: &MethodRef) -> PointerAnalysisResult {
        self.add_reachable(entry);
        while let Some((ptr, pts)) = self.worklist.pop_front() {
            self.propagate(ptr, pts);
        }
        PointerAnalysisResult { pts: self.pts, call_graph: self.call_graph }
    }

    fn add_pfg_edge_with_propagation(&mut self, from: &Pointer, to: &Pointer) {
        if self.pfg.add_edge(from, to) {
            log::trace!("pfg: new edge {from} -> {to}");
            if let Some(existing) = self.pts.get(from).cloned() {
                if !existing.is_empty() {
                    self.worklist.push_back((to.clone(), existing));
                }
            }
        }
    }

    fn propagate(&mut self, ptr: Pointer, incoming: PointsToSet<HeapObj>) {
        let delta = {
            let current = self.pts.entry(ptr.clone()).or_insert_with(PointsToSet::new);
            let delta = current.difference(&incoming);
            if delta.is_empty() {
                return;
            }
            current.extend(&delta);
            delta
        };
        log::trace!("pfg: {ptr} grew by {} object(s)", delta.len());

        for succ in self.pfg.successors_of(&ptr) {
            self.worklist.push_back((succ, delta.clone()));
        }

        if let Pointer::Var(v) = &ptr {
            for obj in delta.iter() {
                self.instance_effect(v, obj.clone());
            }
        }
    }

    fn instance_effect(&mut self, v: &Var, obj: HeapObj) {
        if let Some(stores) = self.sites.store_fields.get(v).cloned() {
            for (name, rhs) in stores {
                if let Operand::Var(y) = rhs {
                    self.add_pfg_edge_with_propagation(&Pointer::Var(y), &Pointer::InstanceField(obj.clone(), name));
                }
            }
        }
        if let Some(loads) = self.sites.load_fields.get(v).cloned() {
            for (name, lhs) in loads {
                self.add_pfg_edge_with_propagation(&Pointer::InstanceField(obj.clone(), name), &Pointer::Var(lhs));
            }
        }
        if let Some(stores) = self.sites.store_arrays.get(v).cloned() {
            for rhs in stores {
                if let Operand::Var(y) = rhs {
                    self.add_pfg_edge_with_propagation(&Pointer::Var(y), &Pointer::ArrayIndex(obj.clone()));
                }
            }
        }
        if let Some(loads) = self.sites.load_arrays.get(v).cloned() {
            for lhs in loads {
                self.add_pfg_edge_with_propagation(&Pointer::ArrayIndex(obj.clone()), &Pointer::Var(lhs));
            }
        }
        if let Some(invokes) = self.sites.invokes.get(v).cloned() {
            for (caller, call) in invokes {
                self.process_call(obj.clone(), &caller, &call);
            }
        }
    }

    fn replay_instance_effects_for(&mut self, v: &Var) {
        if let Some(existing) = self.pts.get(&Pointer::Var(v.clone())).cloned() {
            for obj in existing.iter().cloned().collect::<Vec<_>>() {
                self.instance_effect(v, obj);
            }
        }
    }

    fn add_reachable(&mut self, method_ref: &MethodRef) {
        if !self.call_graph.mark_reachable(method_ref) {
            return;
        }
        log::debug!("pointer analysis: {method_ref} reachable");
        let Some(method) = self.program.method(method_ref) else {
            log::warn!("pointer analysis: reachable method {method_ref} missing from program");
            return;
        };

        for (index, stmt) in method.stmts().iter().enumerate() {
            match stmt {
                Stmt::New { lhs, class } => {
                    let obj = self.heap_model.obj_of(method_ref, index, class);
                    self.worklist.push_back((Pointer::Var(lhs.clone()), PointsToSet::singleton(obj)));
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge_with_propagation(&Pointer::Var(rhs.clone()), &Pointer::Var(lhs.clone()));
                }
                Stmt::LoadField { lhs, field: FieldAccess::Static(f) } => {
                    self.add_pfg_edge_with_propagation(&Pointer::StaticField(f.clone()), &Pointer::Var(lhs.clone()));
                }
                Stmt::StoreField { field: FieldAccess::Static(f), rhs: Operand::Var(v) } => {
                    self.add_pfg_edge_with_propagation(&Pointer::Var(v.clone()), &Pointer::StaticField(f.clone()));
                }
                Stmt::StoreField { field: FieldAccess::Instance(base, name), rhs } => {
                    self.sites.store_fields.entry(base.clone()).or_default().push((name.clone(), rhs.clone()));
                    self.replay_instance_effects_for(base);
                }
                Stmt::LoadField { lhs, field: FieldAccess::Instance(base, name) } => {
                    self.sites.load_fields.entry(base.clone()).or_default().push((name.clone(), lhs.clone()));
                    self.replay_instance_effects_for(base);
                }
                Stmt::StoreArray { base, rhs, .. } => {
                    self.sites.store_arrays.entry(base.clone()).or_default().push(rhs.clone());
                    self.replay_instance_effects_for(base);
                }
                Stmt::LoadArray { lhs, base, .. } => {
                    self.sites.load_arrays.entry(base.clone()).or_default().push(lhs.clone());
                    self.replay_instance_effects_for(base);
                }
                Stmt::Invoke { call } => self.process_invoke(method_ref, call),
                _ => {}
            }
        }
    }

    fn process_invoke(&mut self, caller: &MethodRef, call: &CallSite) {
        match call.kind {
            InvokeKind::Static => {
                let target = call.method.clone();
                self.dispatch_static_like(caller, call, &target);
            }
            InvokeKind::Special => match self.hierarchy.dispatch(&call.method.owner, &call.method.subsignature()) {
                Some(target) => self.dispatch_static_like(caller, call, &target),
                None => log::warn!("pointer analysis: unresolved special callee {}", call.method),
            },
            InvokeKind::Virtual | InvokeKind::Interface => {
                let Some(recv) = &call.receiver else {
                    log::warn!("pointer analysis: virtual/interface call with no receiver in {caller}");
                    return;
                };
                let recv = recv.clone();
                self.sites.invokes.entry(recv.clone()).or_default().push((caller.clone(), call.clone()));
                if let Some(existing) = self.pts.get(&Pointer::Var(recv.clone())).cloned() {
                    for obj in existing.iter().cloned().collect::<Vec<_>>() {
                        self.process_call(obj, caller, call);
                    }
                }
            }
        }
    }

    fn dispatch_static_like(&mut self, caller: &MethodRef, call: &CallSite, target: &MethodRef) {
        self.call_graph.add_edge(caller, target);
        self.add_reachable(target);
        let Some(callee) = self.program.method(target) else {
            log::warn!("pointer analysis: resolved callee {target} missing from program");
            return;
        };
        if let (Some(recv), Some(this_param)) = (&call.receiver, callee.this().cloned()) {
            self.add_pfg_edge_with_propagation(&Pointer::Var(recv.clone()), &Pointer::Var(this_param));
        }
        let params = callee.params().to_vec();
        let return_vars = callee.return_vars();
        self.connect_args_and_return(call, &params, &return_vars);
    }

    fn process_call(&mut self, obj: HeapObj, caller: &MethodRef, call: &CallSite) {
        let Some(target) = self.hierarchy.dispatch(obj.class(), &call.method.subsignature()) else {
            log::warn!("pointer analysis: unresolved virtual callee for {} on {obj}", call.method);
            return;
        };
        self.call_graph.add_edge(caller, &target);
        self.add_reachable(&target);
        let Some(callee) = self.program.method(&target) else {
            log::warn!("pointer analysis: resolved callee {target} missing from program");
            return;
        };
        if let Some(this_param) = callee.this().cloned() {
            self.worklist.push_back((Pointer::Var(this_param), PointsToSet::singleton(obj)));
        }
        let params = callee.params().to_vec();
        let return_vars = callee.return_vars();
        self.connect_args_and_return(call, &params, &return_vars);
    }

    fn connect_args_and_return(&mut self, call: &CallSite, params: &[Var], return_vars: &[Var]) {
        for (arg, param) in call.args.iter().zip(params) {
            if param.is_int_holding() {
                continue;
            }
            if let Operand::Var(a) = arg {
                self.add_pfg_edge_with_propagation(&Pointer::Var(a.clone()), &Pointer::Var(param.clone()));
            }
        }
        if let Some(lhs) = &call.lhs {
            for ret in return_vars {
                self.add_pfg_edge_with_propagation(&Pointer::Var(ret.clone()), &Pointer::Var(lhs.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Method, PrimitiveType};
    use crate::refs::ClassRef;

    fn rvar(owner: &MethodRef, name: &str) -> Var {
        Var::new(owner.clone(), name, PrimitiveType::Reference)
    }

    /// Scenario E (§8): `x = new T1(); y = new T2(); x = y;`. Expects `pts(x) = {o1, o2}`,
    /// `pts(y) = {o2}`.
    #[test]
    fn scenario_e_context_insensitive_pointer() {
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

        let result = PointerAnalysis::new(&program, &hierarchy).solve(&m);
        assert_eq!(result.points_to_set_of_var(&x).len(), 2);
        assert_eq!(result.points_to_set_of_var(&y).len(), 1);
    }

    #[test]
    fn instance_field_store_then_load_flows_through_object() {
        // o.f = y; z = o.f;  (o already points to a single object)
        let hierarchy = ClassHierarchy::new();
        let m = MethodRef::new(ClassRef::new("Main"), "run", 0);
        let o = rvar(&m, "o");
        let y = rvar(&m, "y");
        let z = rvar(&m, "z");
        let stmts = vec![
            Stmt::New { lhs: o.clone(), class: ClassRef::new("T") },
            Stmt::New { lhs: y.clone(), class: ClassRef::new("U") },
            Stmt::StoreField {
                field: FieldAccess::Instance(o.clone(), Arc::from("f")),
                rhs: Operand::Var(y.clone()),
            },
            Stmt::LoadField { lhs: z.clone(), field: FieldAccess::Instance(o.clone(), Arc::from("f")) },
        ];
        let mut program = Program::new();
        program.add_method(Method::new(m.clone(), None, vec![], stmts));

        let result = PointerAnalysis::new(&program, &hierarchy).solve(&m);
        assert_eq!(result.points_to_set_of_var(&z), result.points_to_set_of_var(&y));
        assert_eq!(result.points_to_set_of_var(&z).len(), 1);
    }
}
