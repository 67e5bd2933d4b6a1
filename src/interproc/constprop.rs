//! Interprocedural, alias-aware constant propagation over the ICFG (C9, §4.8).
//!
//! Layered strictly on top of a frozen [`PointerAnalysisResult`] (§9's "Layering" design note):
//! the alias map and field-site bookkeeping are derived once at construction, then never
//! recomputed while the ICFG worklist runs.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use super::icfg::{Icfg, IcfgEdgeKind, IcfgNode};
use crate::constprop::eval::{eval_operand, evaluate};
use crate::error::CallGraphError;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CfgNode, Exp, FieldAccess, Operand, Program, Stmt, Var};
use crate::lattice::{CPFact, Value};
use crate::pfg::PointerAnalysisResult;
use crate::refs::{FieldRef, MethodRef};

/// The frozen result of interprocedural constant propagation: `IN`/`OUT` facts per ICFG node.
#[derive(Debug, Clone, Default)]
pub struct InterproceduralResult {
    in_facts: BTreeMap<IcfgNode, CPFact>,
    out_facts: BTreeMap<IcfgNode, CPFact>,
}

impl InterproceduralResult {
    /// The `IN` fact at `(method, node)`.
    #[must_use]
    pub fn in_fact(&self, method: &MethodRef, node: CfgNode) -> &CPFact {
        &self.in_facts[&(method.clone(), node)]
    }

    /// The `OUT` fact at `(method, node)`.
    #[must_use]
    pub fn out_fact(&self, method: &MethodRef, node: CfgNode) -> &CPFact {
        &self.out_facts[&(method.clone(), node)]
    }
}

#[derive(Debug, Clone, Default)]
struct FieldSites {
    instance_store: BTreeMap<Var, Vec<(Arc<str>, IcfgNode, Operand)>>,
    instance_load: BTreeMap<Var, Vec<(Arc<str>, IcfgNode)>>,
    array_store: BTreeMap<Var, Vec<(IcfgNode, Operand, Operand)>>,
    array_load: BTreeMap<Var, Vec<IcfgNode>>,
    static_store: BTreeMap<FieldRef, Vec<(IcfgNode, Operand)>>,
    static_load: BTreeMap<FieldRef, Vec<IcfgNode>>,
}

/// `aliasMap[base] = {v : pts(v) ∩ pts(base) ≠ ∅}` (§4.8), computed once over every variable
/// with a non-empty points-to set.
fn build_alias_map(pta: &PointerAnalysisResult) -> BTreeMap<Var, BTreeSet<Var>> {
    let vars: Vec<Var> = pta.vars_with_points_to().cloned().collect();
    let mut map: BTreeMap<Var, BTreeSet<Var>> = BTreeMap::new();
    for a in &vars {
        let pts_a = pta.points_to_set_of_var(a);
        for b in &vars {
            if pta.points_to_set_of_var(b).intersects(&pts_a) {
                map.entry(a.clone()).or_default().insert(b.clone());
            }
        }
    }
    map
}

/// The interprocedural constant-propagation solver (C9, §4.8).
pub struct InterproceduralConstantPropagation<'p> {
    program: &'p Program,
    icfg: Icfg,
    alias_map: BTreeMap<Var, BTreeSet<Var>>,
    fields: FieldSites,
    load_dependents: BTreeMap<IcfgNode, Vec<IcfgNode>>,
    in_facts: BTreeMap<IcfgNode, CPFact>,
    out_facts: BTreeMap<IcfgNode, CPFact>,
}

impl<'p> InterproceduralConstantPropagation<'p> {
    /// Builds the ICFG and the frozen alias map from `pta`, ready to [`solve`](Self::solve).
    pub fn new(
        program: &'p Program,
        hierarchy: &'p ClassHierarchy,
        pta: &PointerAnalysisResult,
        entry: &MethodRef,
    ) -> Result<Self, CallGraphError> {
        let icfg = Icfg::build(program, hierarchy, entry)?;
        let alias_map = build_alias_map(pta);
        let fields = scan_field_sites(program, &icfg);
        let load_dependents = build_load_dependents(&fields, &alias_map);

        let mut in_facts = BTreeMap::new();
        let mut out_facts = BTreeMap::new();
        for node in icfg.nodes() {
            in_facts.insert(node.clone(), CPFact::new());
            out_facts.insert(node.clone(), CPFact::new());
        }
        let boundary = icfg.entry().clone();
        let boundary_method = program.method(&boundary.0).ok_or_else(|| CallGraphError::UndeclaredMethod(boundary.0.clone()))?;
        let mut seed = CPFact::new();
        for param in boundary_method.params().iter().filter(|p| p.is_int_holding()) {
            seed.update(param.clone(), Value::Nac);
        }
        out_facts.insert(boundary.clone(), seed);

        Ok(Self { program, icfg, alias_map, fields, load_dependents, in_facts, out_facts })
    }

    /// Runs the ICFG worklist to a fixpoint (§4.8).
    #[must_use]
    pub fn solve(mut self) -> InterproceduralResult {
        let boundary = self.icfg.entry().clone();
        let mut queue: VecDeque<IcfgNode> = VecDeque::new();
        let mut queued: HashSet<IcfgNode> = HashSet::new();
        for node in self.icfg.nodes() {
            if *node != boundary && queued.insert(node.clone()) {
                queue.push_back(node.clone());
            }
        }

        while let Some(n) = queue.pop_front() {
            queued.remove(&n);

            let mut merged = CPFact::new();
            for (pred, kind) in self.icfg.preds_of(&n).to_vec() {
                let pred_out = self.out_facts[&pred].clone();
                let edge_fact = self.transfer_edge(&kind, &pred, &n, &pred_out);
                merged.meet_into(&edge_fact);
            }
            self.in_facts.insert(n.clone(), merged.clone());

            let new_out = self.transfer_node(&n, &merged);
            let changed = new_out != self.out_facts[&n];
            self.out_facts.insert(n.clone(), new_out);

            log::trace!("interproc worklist: processed {n:?}, changed: {changed}");

            if changed {
                for (succ, _) in self.icfg.succs_of(&n).to_vec() {
                    if succ != boundary && queued.insert(succ.clone()) {
                        queue.push_back(succ);
                    }
                }
                if let Some(deps) = self.load_dependents.get(&n).cloned() {
                    for dep in deps {
                        if queued.insert(dep.clone()) {
                            queue.push_back(dep);
                        }
                    }
                }
            }
        }

        InterproceduralResult { in_facts: self.in_facts, out_facts: self.out_facts }
    }

    fn transfer_edge(&self, kind: &IcfgEdgeKind, pred: &IcfgNode, to: &IcfgNode, pred_out: &CPFact) -> CPFact {
        match kind {
            IcfgEdgeKind::Normal => pred_out.clone(),
            IcfgEdgeKind::CallToReturn => {
                let mut fact = pred_out.clone();
                if let Stmt::Invoke { call } = self.stmt_at(pred) {
                    if let Some(lhs) = &call.lhs {
                        fact.remove(lhs);
                    }
                }
                fact
            }
            IcfgEdgeKind::Call => {
                let mut fact = CPFact::new();
                let Stmt::Invoke { call } = self.stmt_at(pred) else { return fact };
                let Some(callee) = self.program.method(&to.0) else { return fact };
                for (param, arg) in callee.params().iter().zip(&call.args) {
                    if param.is_int_holding() {
                        fact.update(param.clone(), eval_operand(arg, pred_out));
                    }
                }
                fact
            }
            IcfgEdgeKind::Return { call_node } => {
                let mut fact = CPFact::new();
                let Stmt::Invoke { call } = self.stmt_at(call_node) else { return fact };
                let Some(lhs) = &call.lhs else { return fact };
                let Some(callee) = self.program.method(&pred.0) else { return fact };
                let mut value = Value::Undef;
                for ret in callee.return_vars() {
                    value = value.meet(pred_out.get(&ret));
                }
                fact.update(lhs.clone(), value);
                fact
            }
        }
    }

    fn transfer_node(&self, node: &IcfgNode, in_fact: &CPFact) -> CPFact {
        let CfgNode::Stmt(index) = node.1 else {
            return in_fact.clone();
        };
        let Some(method) = self.program.method(&node.0) else {
            return in_fact.clone();
        };

        match method.stmt(index) {
            Stmt::Assign { lhs, rhs } if lhs.is_int_holding() => {
                let mut next = in_fact.clone();
                next.update(lhs.clone(), evaluate(rhs, in_fact));
                next
            }
            Stmt::LoadField { lhs, field: FieldAccess::Static(f) } if lhs.is_int_holding() => {
                let mut next = in_fact.clone();
                let value = self.meet_static_stores(f);
                next.update(lhs.clone(), value);
                next
            }
            Stmt::LoadField { lhs, field: FieldAccess::Instance(base, name) } if lhs.is_int_holding() => {
                let mut next = in_fact.clone();
                let value = self.meet_instance_stores(base, name);
                next.update(lhs.clone(), value);
                next
            }
            Stmt::LoadArray { lhs, base, index } if lhs.is_int_holding() => {
                let mut next = in_fact.clone();
                let index_val = eval_operand(index, in_fact);
                let value = self.meet_array_stores(base, index_val);
                next.update(lhs.clone(), value);
                next
            }
            _ => in_fact.clone(),
        }
    }

    fn meet_static_stores(&self, field: &FieldRef) -> Value {
        let mut value = Value::Undef;
        for (site, rhs) in self.fields.static_store.get(field).into_iter().flatten() {
            value = value.meet(eval_operand(rhs, &self.out_facts[site]));
        }
        value
    }

    fn meet_instance_stores(&self, base: &Var, field: &str) -> Value {
        let mut value = Value::Undef;
        let aliases = self.alias_map.get(base).cloned().unwrap_or_else(|| BTreeSet::from([base.clone()]));
        for alias in &aliases {
            let Some(stores) = self.fields.instance_store.get(alias) else { continue };
            for (name, site, rhs) in stores {
                if name.as_ref() == field {
                    value = value.meet(eval_operand(rhs, &self.out_facts[site]));
                }
            }
        }
        value
    }

    fn meet_array_stores(&self, base: &Var, load_index: Value) -> Value {
        let mut value = Value::Undef;
        let aliases = self.alias_map.get(base).cloned().unwrap_or_else(|| BTreeSet::from([base.clone()]));
        for alias in &aliases {
            let Some(stores) = self.fields.array_store.get(alias) else { continue };
            for (site, index_op, rhs) in stores {
                let store_index = eval_operand(index_op, &self.out_facts[site]);
                if index_match(load_index, store_index) {
                    value = value.meet(eval_operand(rhs, &self.out_facts[site]));
                }
            }
        }
        value
    }

    fn stmt_at(&self, node: &IcfgNode) -> &Stmt {
        let CfgNode::Stmt(index) = node.1 else {
            panic!("ICFG call/return edge endpoint {node:?} is not a statement node");
        };
        self.program
            .method(&node.0)
            .expect("ICFG node references a method outside the program")
            .stmt(index)
    }
}

/// `indexMatch` (§4.8): true iff both indices are the same constant, or either is `NAC`.
fn index_match(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Const(x), Value::Const(y)) => x == y,
        (Value::Nac, _) | (_, Value::Nac) => true,
        _ => false,
    }
}

fn scan_field_sites(program: &Program, icfg: &Icfg) -> FieldSites {
    let mut fields = FieldSites::default();
    let mut seen_methods: BTreeSet<MethodRef> = BTreeSet::new();
    for node in icfg.nodes() {
        if !seen_methods.insert(node.0.clone()) {
            continue;
        }
        let Some(method) = program.method(&node.0) else { continue };
        for (index, stmt) in method.stmts().iter().enumerate() {
            let site: IcfgNode = (node.0.clone(), CfgNode::Stmt(index));
            match stmt {
                Stmt::StoreField { field: FieldAccess::Static(f), rhs } => {
                    fields.static_store.entry(f.clone()).or_default().push((site, rhs.clone()));
                }
                Stmt::LoadField { field: FieldAccess::Static(f), .. } => {
                    fields.static_load.entry(f.clone()).or_default().push(site);
                }
                Stmt::StoreField { field: FieldAccess::Instance(base, name), rhs } => {
                    fields.instance_store.entry(base.clone()).or_default().push((name.clone(), site, rhs.clone()));
                }
                Stmt::LoadField { field: FieldAccess::Instance(base, name), .. } => {
                    fields.instance_load.entry(base.clone()).or_default().push((name.clone(), site));
                }
                Stmt::StoreArray { base, index, rhs } => {
                    fields.array_store.entry(base.clone()).or_default().push((site, index.clone(), rhs.clone()));
                }
                Stmt::LoadArray { base, .. } => {
                    fields.array_load.entry(base.clone()).or_default().push(site);
                }
                _ => {}
            }
        }
    }
    fields
}

/// For every store site, the load sites whose alias-derived value depends on it: re-enqueued
/// whenever the store's operand value changes (§4.8's "enqueue all dependent loads").
fn build_load_dependents(fields: &FieldSites, alias_map: &BTreeMap<Var, BTreeSet<Var>>) -> BTreeMap<IcfgNode, Vec<IcfgNode>> {
    let mut deps: BTreeMap<IcfgNode, Vec<IcfgNode>> = BTreeMap::new();

    for (field, stores) in &fields.static_store {
        let Some(loads) = fields.static_load.get(field) else { continue };
        for (store_site, _) in stores {
            deps.entry(store_site.clone()).or_default().extend(loads.iter().cloned());
        }
    }

    for (base, stores) in &fields.instance_store {
        for (name, store_site, _) in stores {
            for (other, aliases) in alias_map {
                if !aliases.contains(base) {
                    continue;
                }
                let Some(loads) = fields.instance_load.get(other) else { continue };
                for (load_name, load_site) in loads {
                    if load_name == name {
                        deps.entry(store_site.clone()).or_default().push(load_site.clone());
                    }
                }
            }
        }
    }

    for (base, stores) in &fields.array_store {
        for (store_site, ..) in stores {
            for (other, aliases) in alias_map {
                if !aliases.contains(base) {
                    continue;
                }
                if let Some(loads) = fields.array_load.get(other) {
                    deps.entry(store_site.clone()).or_default().extend(loads.iter().cloned());
                }
            }
        }
    }

    deps
}
