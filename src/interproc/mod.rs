//! The interprocedural control-flow graph and the alias-aware interprocedural
//! constant-propagation solver built over it (C9, §4.8).

pub mod constprop;
pub mod icfg;

pub use constprop::{InterproceduralConstantPropagation, InterproceduralResult};
pub use icfg::{Icfg, IcfgEdgeKind, IcfgNode};
