#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    rust_2021_compatibility
)]
#![deny(rustdoc::broken_intra_doc_links)]

//! A whole-program static analysis engine for class-based, object-oriented intermediate
//! representations: intraprocedural constant propagation and live-variable/dead-code detection,
//! class-hierarchy-based call-graph construction, context-insensitive and context-sensitive
//! pointer analysis, a taint-flow overlay, and an interprocedural solver tying them together.

pub mod callgraph;
pub mod constprop;
pub mod context;
pub mod dataflow;
pub mod error;
pub mod hierarchy;
pub mod interproc;
pub mod ir;
pub mod lattice;
pub mod liveness;
pub mod options;
pub mod pfg;
pub mod refs;
pub mod taint;
