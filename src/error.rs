//! Crate-wide error types (§7), one per fallible subsystem, aggregated behind [`Error`].
//!
//! Grounded on `jvm::class_loader::Error`'s `thiserror`-derived, `#[from]`-chained shape: each
//! subsystem gets its own enum naming only *its* fatal conditions (§4.10/§7's "structural IR
//! faults" are fatal; everything else in §7 is handled in place and never raised here).

use crate::refs::MethodRef;

/// A fatal fault in the dataflow framework (§7): the only error kind the generic solver itself
/// can raise, since `meetInto`/`transferNode` are (by construction, via the `Analysis` trait)
/// infallible once the IR is well-formed.
#[derive(thiserror::Error, Debug)]
pub enum DataflowError {
    /// A node was queried that does not belong to the CFG being solved.
    #[error("node does not belong to this CFG")]
    UnknownNode,
}

/// A fatal fault in call-graph construction (§7).
#[derive(thiserror::Error, Debug)]
pub enum CallGraphError {
    /// A call site's declared method could not be found anywhere in the class hierarchy,
    /// including by walking supertypes — this is distinct from "no dispatch target at a
    /// dynamic call site" (§7), which is silently tolerated; this is a malformed program.
    #[error("no declaration of {0} found in the class hierarchy")]
    UndeclaredMethod(MethodRef),
}

/// A fatal fault in the pointer analysis or interprocedural solver (§7).
#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    /// A statement kind appeared where the transfer function's precondition rules it out
    /// (e.g. an `Invoke` callsite whose resolved callee's arity does not match the call's
    /// argument count).
    #[error("structural IR fault: {0}")]
    MalformedIr(String),
    /// The method referenced by a call edge, entry point, or ICFG node is not present in the
    /// [`crate::ir::Program`] being analyzed.
    #[error("method not found in program: {0}")]
    MissingMethod(MethodRef),
}

/// The crate-wide error type returned by top-level analysis entry points.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// See [`DataflowError`].
    #[error(transparent)]
    Dataflow(#[from] DataflowError),
    /// See [`CallGraphError`].
    #[error(transparent)]
    CallGraph(#[from] CallGraphError),
    /// See [`SolverError`].
    #[error(transparent)]
    Solver(#[from] SolverError),
}
