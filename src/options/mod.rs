//! The configuration surface threaded into the pointer-analysis and taint entry points
//! (`AnalysisOptions`, A5, §4.13).

use crate::context::{CallSiteSensitive, ContextSensitiveAnalysis, ContextSensitiveResult, Insensitive, ObjectSensitive};
use crate::hierarchy::ClassHierarchy;
use crate::ir::Program;
use crate::refs::MethodRef;
use crate::taint::{TaintConfig, TaintResult};

/// Which context-sensitivity policy governs a pointer-analysis run (§4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextSensitivity {
    /// Context-insensitive (§4.5).
    #[default]
    Insensitive,
    /// `k`-call-site-sensitivity, conventionally `k ∈ {1, 2}`.
    CallSiteSensitive(usize),
    /// `k`-object-sensitivity.
    ObjectSensitive(usize),
}

impl ContextSensitivity {
    /// Runs the context-sensitive pointer analysis under this policy.
    #[must_use]
    pub fn analyze(self, program: &Program, hierarchy: &ClassHierarchy, entry: &MethodRef) -> ContextSensitiveResult {
        match self {
            Self::Insensitive => ContextSensitiveAnalysis::new(program, hierarchy, Insensitive).solve(entry),
            Self::CallSiteSensitive(k) => ContextSensitiveAnalysis::new(program, hierarchy, CallSiteSensitive { k }).solve(entry),
            Self::ObjectSensitive(k) => ContextSensitiveAnalysis::new(program, hierarchy, ObjectSensitive { k }).solve(entry),
        }
    }

    /// Runs the pointer analysis and the taint overlay (C8) together under this policy, so taint
    /// objects ride the same context-sensitive PFG the points-to fixpoint builds.
    #[must_use]
    pub fn analyze_with_taint(
        self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        entry: &MethodRef,
        taint: &TaintConfig,
    ) -> (ContextSensitiveResult, TaintResult) {
        match self {
            Self::Insensitive => ContextSensitiveAnalysis::new(program, hierarchy, Insensitive).solve_with_taint(entry, taint),
            Self::CallSiteSensitive(k) => {
                ContextSensitiveAnalysis::new(program, hierarchy, CallSiteSensitive { k }).solve_with_taint(entry, taint)
            }
            Self::ObjectSensitive(k) => {
                ContextSensitiveAnalysis::new(program, hierarchy, ObjectSensitive { k }).solve_with_taint(entry, taint)
            }
        }
    }
}

/// The configuration value threaded into analysis entry points (§6's consumed `AnalysisOptions`).
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// The name of a previously computed pointer-analysis result to reuse, if any (§6).
    pub pta: Option<String>,
    /// The context-sensitivity policy to use when computing a fresh pointer analysis.
    pub context_sensitivity: ContextSensitivity,
    /// An optional taint configuration to run alongside the pointer analysis.
    pub taint: Option<TaintConfig>,
}

impl AnalysisOptions {
    /// The default options: context-insensitive, no taint configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context-sensitivity policy.
    #[must_use]
    pub fn with_context_sensitivity(mut self, cs: ContextSensitivity) -> Self {
        self.context_sensitivity = cs;
        self
    }

    /// Attaches a taint configuration.
    #[must_use]
    pub fn with_taint(mut self, taint: TaintConfig) -> Self {
        self.taint = Some(taint);
        self
    }

    /// Runs the configured pointer analysis, and the taint overlay alongside it when a
    /// [`TaintConfig`] is attached.
    #[must_use]
    pub fn analyze(&self, program: &Program, hierarchy: &ClassHierarchy, entry: &MethodRef) -> (ContextSensitiveResult, Option<TaintResult>) {
        match &self.taint {
            Some(taint) => {
                let (pts, taint) = self.context_sensitivity.analyze_with_taint(program, hierarchy, entry, taint);
                (pts, Some(taint))
            }
            None => (self.context_sensitivity.analyze(program, hierarchy, entry), None),
        }
    }
}
