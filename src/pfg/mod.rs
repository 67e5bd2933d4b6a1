//! The Pointer Flow Graph and the context-insensitive pointer analysis it backs (C6, §3, §4.5).

pub mod graph;
pub mod heap;
pub mod pointer;
pub mod solver;

pub use graph::PointerFlowGraph;
pub use heap::{HeapModel, HeapObj};
pub use pointer::Pointer;
pub use solver::{PointerAnalysis, PointerAnalysisResult};
