//! The taint-flow overlay (C8, §4.7): a Taint Flow Graph (TFG) of source/transfer/sink rules
//! layered directly on top of the context-sensitive pointer solver's own Pointer Flow Graph.
//!
//! Taint objects are seeded into the same worklist the points-to solver runs (see
//! [`crate::context::solver::ContextSensitiveAnalysis::solve_with_taint`]) and ride every PFG
//! edge the points-to fixpoint establishes — arg→param, callee-return→caller-LHS, and
//! instance-field/array store↔load edges discovered through aliasing — so a tainted value
//! survives an ordinary pass-through call or a heap carrier exactly as the points-to analysis
//! would route a real object. `TaintTransfer` rules add edges on top of that PFG, re-minting the
//! taint object's declared type at the destination; sinks are reported by inspecting the
//! points-to-shaped taint set of the designated argument pointer once the shared fixpoint
//! settles.

use std::sync::Arc;

use crate::context::{Context, ContextSensitiveAnalysis, Insensitive};
use crate::error::Error;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallSite, Operand, Program, Var};
use crate::refs::MethodRef;

/// A position within a call's taint-relevant data (§4.7): the receiver, an argument by index, or
/// the call's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    /// The receiver (`BASE`).
    Base,
    /// A non-negative argument index.
    Arg(usize),
    /// The call's LHS (`RESULT`).
    Result,
}

/// A method whose calls mint a fresh taint object on the LHS, provenanced by the callsite.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Source {
    /// The declaring method whose calls are sources.
    pub method: MethodRef,
    /// The declared type the minted taint object carries.
    pub ty: Arc<str>,
}

impl Source {
    /// Declares `method` as a source minting taint objects of type `ty`.
    #[must_use]
    pub fn new(method: MethodRef, ty: impl Into<Arc<str>>) -> Self {
        Self { method, ty: ty.into() }
    }
}

/// A method/argument pair where arriving taint is reported (§4.7).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sink {
    /// The declaring method whose calls are sinks.
    pub method: MethodRef,
    /// The argument index inspected for taint.
    pub arg_index: usize,
}

impl Sink {
    /// Declares `method` a sink on argument `arg_index`.
    #[must_use]
    pub fn new(method: MethodRef, arg_index: usize) -> Self {
        Self { method, arg_index }
    }
}

/// A rule propagating taint from one call position to another, re-minting the taint object's
/// declared type at the destination (§4.7, §9's "do not collapse by source alone"). This is the
/// one TFG edge kind that is *not* already implied by the points-to solver's own PFG edges, since
/// a transfer deliberately changes the carried declared type rather than aliasing the same
/// object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaintTransfer {
    /// The declaring method whose calls this transfer applies to.
    pub method: MethodRef,
    /// The position taint flows from.
    pub from: Position,
    /// The position taint flows to.
    pub to: Position,
    /// The declared type the re-minted taint object carries at `to`.
    pub ty: Arc<str>,
}

impl TaintTransfer {
    /// Declares a transfer rule for `method`.
    #[must_use]
    pub fn new(method: MethodRef, from: Position, to: Position, ty: impl Into<Arc<str>>) -> Self {
        Self { method, from, to, ty: ty.into() }
    }
}

/// An in-memory taint rule set (`TaintConfig`, §4.13): constructed directly by callers, no
/// configuration-file parsing (out of scope).
#[derive(Debug, Clone, Default)]
pub struct TaintConfig {
    sources: Vec<Source>,
    sinks: Vec<Sink>,
    transfers: Vec<TaintTransfer>,
}

impl TaintConfig {
    /// An empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source rule.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds a sink rule.
    #[must_use]
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds a transfer rule.
    #[must_use]
    pub fn with_transfer(mut self, transfer: TaintTransfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    pub(crate) fn source_for(&self, method: &MethodRef) -> Option<&Source> {
        self.sources.iter().find(|s| &s.method == method)
    }

    pub(crate) fn sinks_for(&self, method: &MethodRef) -> impl Iterator<Item = &Sink> {
        self.sinks.iter().filter(move |s| &s.method == method)
    }

    pub(crate) fn transfers_for(&self, method: &MethodRef) -> impl Iterator<Item = &TaintTransfer> {
        self.transfers.iter().filter(move |t| &t.method == method)
    }
}

/// A taint object: provenanced by its originating source callsite, distinguished from other
/// objects sharing that provenance by its current declared type (§9's open-question resolution —
/// re-minting at a transfer produces a genuinely distinct object, never collapsed by source
/// alone).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaintObj {
    source_method: MethodRef,
    source_index: usize,
    ty: Arc<str>,
}

impl TaintObj {
    pub(crate) fn new(source_method: MethodRef, source_index: usize, ty: Arc<str>) -> Self {
        Self { source_method, source_index, ty }
    }

    /// The `(method, statement index)` of the source call that minted this object.
    pub(crate) fn provenance(&self) -> (MethodRef, usize) {
        (self.source_method.clone(), self.source_index)
    }

    /// The same provenance, carrying a different declared type — what a [`TaintTransfer`] mints.
    pub(crate) fn re_minted(&self, ty: Arc<str>) -> Self {
        Self { source_method: self.source_method.clone(), source_index: self.source_index, ty }
    }
}

impl std::fmt::Display for TaintObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "taint@{}:{}:{}", self.source_method, self.source_index, self.ty)
    }
}

/// A reported taint flow (§6's produced interface): a source callsite, a sink callsite, and the
/// tainted argument index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaintFlow {
    /// The `(method, statement index)` of the source call that minted the flowing object.
    pub source: (MethodRef, usize),
    /// The `(method, statement index)` of the sink call where the object was observed.
    pub sink: (MethodRef, usize),
    /// The sink argument index the object was found at.
    pub sink_arg_index: usize,
}

/// The overlay's produced result: every taint flow a path of TFG/PFG edges connects from a
/// source to a sink (§7 invariant 7).
#[derive(Debug, Clone, Default)]
pub struct TaintResult {
    flows: std::collections::BTreeSet<TaintFlow>,
}

impl TaintResult {
    pub(crate) fn new(flows: std::collections::BTreeSet<TaintFlow>) -> Self {
        Self { flows }
    }

    /// Every reported taint flow, in deterministic order.
    #[must_use]
    pub fn flows(&self) -> &std::collections::BTreeSet<TaintFlow> {
        &self.flows
    }
}

/// A sink occurrence discovered while scanning a call site: the variable whose (context-keyed)
/// taint set is inspected once the shared fixpoint settles.
pub(crate) struct TaintSinkHit {
    pub(crate) ctx: Context,
    pub(crate) caller: MethodRef,
    pub(crate) stmt_index: usize,
    pub(crate) sink: Sink,
    pub(crate) arg_var: Var,
}

/// Resolves which variable (if any) sits at `pos` for `call` (§4.7): the receiver for `Base`, the
/// argument variable for `Arg(i)`, or the call's LHS for `Result`.
pub(crate) fn position_var(call: &CallSite, pos: Position) -> Option<Var> {
    match pos {
        Position::Base => call.receiver.clone(),
        Position::Arg(i) => match call.args.get(i) {
            Some(Operand::Var(v)) => Some(v.clone()),
            _ => None,
        },
        Position::Result => call.lhs.clone(),
    }
}

/// Runs the taint overlay plugged into a context-insensitive pointer-analysis fixpoint (§4.7).
/// A context-sensitive caller should instead drive
/// [`ContextSensitiveAnalysis::solve_with_taint`] directly with its own selector.
#[derive(Debug)]
pub struct TaintAnalysis<'p> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    config: &'p TaintConfig,
}

impl<'p> TaintAnalysis<'p> {
    /// Creates an overlay solver scanning `program` under `hierarchy` for `config`'s rules.
    #[must_use]
    pub fn new(program: &'p Program, hierarchy: &'p ClassHierarchy, config: &'p TaintConfig) -> Self {
        Self { program, hierarchy, config }
    }

    /// Runs the pointer analysis and the taint overlay together, starting from `entry`.
    pub fn solve(self, entry: &MethodRef) -> Result<TaintResult, Error> {
        let (_, taint) = ContextSensitiveAnalysis::new(self.program, self.hierarchy, Insensitive).solve_with_taint(entry, self.config);
        Ok(taint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ClassHierarchy;
    use crate::ir::{CallSite, InvokeKind, Method, PrimitiveType, Stmt};
    use crate::refs::ClassRef;

    fn rvar(owner: &MethodRef, name: &str) -> Var {
        Var::new(owner.clone(), name, PrimitiveType::Reference)
    }

    /// Scenario G (§8): `t = S.src(); u = U.wrap(t); K.sink(u);`. Expects exactly one `TaintFlow`.
    #[test]
    fn scenario_g_taint_flow_through_transfer() {
        let hierarchy = ClassHierarchy::new();
        let m = MethodRef::new(ClassRef::new("Main"), "run", 0);
        let src_method = MethodRef::new(ClassRef::new("S"), "src", 0);
        let wrap_method = MethodRef::new(ClassRef::new("U"), "wrap", 1);
        let sink_method = MethodRef::new(ClassRef::new("K"), "sink", 1);

        let t = rvar(&m, "t");
        let u = rvar(&m, "u");

        let stmts = vec![
            Stmt::Invoke {
                call: CallSite { kind: InvokeKind::Static, method: src_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
            },
            Stmt::Invoke {
                call: CallSite {
                    kind: InvokeKind::Static,
                    method: wrap_method.clone(),
                    receiver: None,
                    args: vec![Operand::Var(t.clone())],
                    lhs: Some(u.clone()),
                },
            },
            Stmt::Invoke {
                call: CallSite {
                    kind: InvokeKind::Static,
                    method: sink_method.clone(),
                    receiver: None,
                    args: vec![Operand::Var(u.clone())],
                    lhs: None,
                },
            },
        ];
        let mut program = Program::new();
        program.add_method(Method::new(m.clone(), None, vec![], stmts));

        let config = TaintConfig::new()
            .with_source(Source::new(src_method, "S$Tainted"))
            .with_transfer(TaintTransfer::new(wrap_method, Position::Arg(0), Position::Result, "U$Wrapped"))
            .with_sink(Sink::new(sink_method, 0));

        let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&m).unwrap();
        assert_eq!(result.flows().len(), 1);
        let flow = result.flows().iter().next().unwrap();
        assert_eq!(flow.source, (m.clone(), 0));
        assert_eq!(flow.sink, (m, 2));
        assert_eq!(flow.sink_arg_index, 0);
    }

    /// Taint survives an ordinary pass-through call (arg→param, return→lhs PFG edges), with no
    /// transfer rule involved at all.
    #[test]
    fn taint_survives_plain_method_call_via_pfg_edges() {
        let hierarchy = ClassHierarchy::new();
        let m = MethodRef::new(ClassRef::new("Main"), "run", 0);
        let id_method = MethodRef::new(ClassRef::new("Util"), "id", 1);
        let sink_method = MethodRef::new(ClassRef::new("K"), "sink", 1);
        let src_method = MethodRef::new(ClassRef::new("S"), "src", 0);

        let t = rvar(&m, "t");
        let x = rvar(&m, "x");
        let p = rvar(&id_method, "p");
        let r = rvar(&id_method, "r");

        let mut program = Program::new();
        program.add_method(Method::new(
            m.clone(),
            None,
            vec![],
            vec![
                Stmt::Invoke {
                    call: CallSite { kind: InvokeKind::Static, method: src_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
                },
                Stmt::Invoke {
                    call: CallSite {
                        kind: InvokeKind::Static,
                        method: id_method.clone(),
                        receiver: None,
                        args: vec![Operand::Var(t.clone())],
                        lhs: Some(x.clone()),
                    },
                },
                Stmt::Invoke {
                    call: CallSite {
                        kind: InvokeKind::Static,
                        method: sink_method.clone(),
                        receiver: None,
                        args: vec![Operand::Var(x.clone())],
                        lhs: None,
                    },
                },
            ],
        ));
        program.add_method(Method::new(
            id_method.clone(),
            None,
            vec![p.clone()],
            vec![Stmt::Copy { lhs: r.clone(), rhs: p.clone() }, Stmt::Return { var: Some(r.clone()) }],
        ));

        let config = TaintConfig::new().with_source(Source::new(src_method, "S$Tainted")).with_sink(Sink::new(sink_method, 0));

        let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&m).unwrap();
        assert_eq!(result.flows().len(), 1);
        let flow = result.flows().iter().next().unwrap();
        assert_eq!(flow.source, (m.clone(), 0));
        assert_eq!(flow.sink, (m, 2));
    }

    /// Taint survives a heap carrier: `o.f = t; y = p.f` where `p` aliases `o`.
    #[test]
    fn taint_survives_instance_field_store_and_aliased_load() {
        let hierarchy = ClassHierarchy::new();
        let m = MethodRef::new(ClassRef::new("Main"), "run", 0);
        let src_method = MethodRef::new(ClassRef::new("S"), "src", 0);
        let sink_method = MethodRef::new(ClassRef::new("K"), "sink", 1);

        let t = rvar(&m, "t");
        let o = rvar(&m, "o");
        let p = rvar(&m, "p");
        let y = rvar(&m, "y");

        let stmts = vec![
            Stmt::Invoke {
                call: CallSite { kind: InvokeKind::Static, method: src_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
            },
            Stmt::New { lhs: o.clone(), class: ClassRef::new("Box") },
            Stmt::StoreField { field: crate::ir::FieldAccess::Instance(o.clone(), Arc::from("f")), rhs: Operand::Var(t.clone()) },
            Stmt::Copy { lhs: p.clone(), rhs: o.clone() },
            Stmt::LoadField { lhs: y.clone(), field: crate::ir::FieldAccess::Instance(p.clone(), Arc::from("f")) },
            Stmt::Invoke {
                call: CallSite {
                    kind: InvokeKind::Static,
                    method: sink_method.clone(),
                    receiver: None,
                    args: vec![Operand::Var(y.clone())],
                    lhs: None,
                },
            },
        ];
        let mut program = Program::new();
        program.add_method(Method::new(m.clone(), None, vec![], stmts));

        let config = TaintConfig::new().with_source(Source::new(src_method, "S$Tainted")).with_sink(Sink::new(sink_method, 0));

        let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&m).unwrap();
        assert_eq!(result.flows().len(), 1);
        let flow = result.flows().iter().next().unwrap();
        assert_eq!(flow.source, (m.clone(), 0));
        assert_eq!(flow.sink, (m, 5));
    }
}
