//! A method's IR: its parameters, statement list, and derived control-flow graph (§4.11's
//! `ir::Method` / `ir::Program`, realizing the consumed `IR`/`CFG` interfaces of §6).

use std::collections::BTreeMap;

use super::cfg::Cfg;
use super::stmt::Stmt;
use super::var::Var;
use crate::refs::MethodRef;

/// A single method's intermediate representation.
#[derive(Debug, Clone)]
pub struct Method {
    id: MethodRef,
    /// `this`, for instance methods (`None` for `static` methods).
    this: Option<Var>,
    params: Vec<Var>,
    stmts: Vec<Stmt>,
    cfg: Cfg,
}

impl Method {
    /// Builds a method from its identity, optional `this`, parameters, and statement list. The
    /// control-flow graph is derived from the statement list (§4.11).
    #[must_use]
    pub fn new(id: MethodRef, this: Option<Var>, params: Vec<Var>, stmts: Vec<Stmt>) -> Self {
        let cfg = Cfg::build(&stmts);
        Self { id, this, params, stmts, cfg }
    }

    /// This method's identity.
    #[must_use]
    pub fn id(&self) -> &MethodRef {
        &self.id
    }

    /// Whether this method is `static` (no receiver).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.this.is_none()
    }

    /// The `this` variable, for instance methods.
    #[must_use]
    pub fn this(&self) -> Option<&Var> {
        self.this.as_ref()
    }

    /// The method's declared parameters, in declaration order (`getParams()`, §6).
    #[must_use]
    pub fn params(&self) -> &[Var] {
        &self.params
    }

    /// The method's statement list in program order (`getStmts()`, §6).
    #[must_use]
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    /// The statement at `index`.
    #[must_use]
    pub fn stmt(&self, index: usize) -> &Stmt {
        &self.stmts[index]
    }

    /// The method's control-flow graph.
    #[must_use]
    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// The variables used as `return` operands anywhere in the method (`getReturnVars()`, §6).
    #[must_use]
    pub fn return_vars(&self) -> Vec<Var> {
        self.stmts
            .iter()
            .filter_map(|s| match s {
                Stmt::Return { var: Some(v) } => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every variable this method's int-holding parameters cover (§4.2's boundary fact).
    #[must_use]
    pub fn int_holding_params(&self) -> impl Iterator<Item = &Var> {
        self.params.iter().filter(|p| p.is_int_holding())
    }
}

/// A whole program: every reachable method's IR, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Program {
    methods: BTreeMap<MethodRef, Method>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method's IR to the program.
    pub fn add_method(&mut self, method: Method) {
        self.methods.insert(method.id().clone(), method);
    }

    /// Looks up a method's IR by identity.
    #[must_use]
    pub fn method(&self, id: &MethodRef) -> Option<&Method> {
        self.methods.get(id)
    }

    /// Iterates over every method in the program, in identity order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }
}
