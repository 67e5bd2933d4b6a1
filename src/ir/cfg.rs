//! Per-method control-flow graphs (§3, §4.11), grounded on the teacher's
//! `ir::control_flow::ControlFlowGraph<N, E>`: a dense adjacency map keyed by node, with a
//! distinct edge-kind payload per outgoing edge.

use std::collections::BTreeMap;

use super::stmt::Stmt;

/// A node in a method's [`Cfg`]: either a real statement, or one of the two virtual
/// entry/exit nodes the boundary facts of §4.1 are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgNode {
    /// The virtual entry node, preceding the method's first statement.
    Entry,
    /// A real statement, identified by its index in the method's statement list.
    Stmt(usize),
    /// The virtual exit node, following every `return`.
    Exit,
}

impl CfgNode {
    fn order_key(self) -> (u8, usize) {
        match self {
            Self::Entry => (0, 0),
            Self::Stmt(i) => (1, i),
            Self::Exit => (2, 0),
        }
    }
}

impl PartialOrd for CfgNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for CfgNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// The kind of an outgoing [`Cfg`] edge (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Falls through to the next statement (or to `Exit`, for a `return`).
    FallThrough,
    /// The `true` branch of an `If`.
    IfTrue,
    /// The `false` branch of an `If`.
    IfFalse,
    /// A matching `Switch` case.
    SwitchCase(i32),
    /// The `Switch` default branch.
    SwitchDefault,
}

/// A method's control-flow graph: a dense map from each node to its outgoing edges.
///
/// Construction is total: every node reaches `Exit` by construction, so the graph is always
/// well-formed for a well-formed statement list (§4.10 - structural IR faults are the caller's
/// responsibility, not this constructor's).
#[derive(Debug, Clone)]
pub struct Cfg {
    succ: BTreeMap<CfgNode, BTreeMap<CfgNode, EdgeKind>>,
    pred: BTreeMap<CfgNode, BTreeMap<CfgNode, EdgeKind>>,
    stmt_count: usize,
}

impl Cfg {
    /// Builds the control-flow graph for a method's linear statement list, using each
    /// statement's embedded branch targets (`If`/`Switch`) to compute non-fall-through edges.
    #[must_use]
    pub fn build(stmts: &[Stmt]) -> Self {
        let mut succ: BTreeMap<CfgNode, BTreeMap<CfgNode, EdgeKind>> = BTreeMap::new();
        let mut pred: BTreeMap<CfgNode, BTreeMap<CfgNode, EdgeKind>> = BTreeMap::new();

        let mut add_edge = |succ: &mut BTreeMap<_, BTreeMap<_, _>>,
                             pred: &mut BTreeMap<_, BTreeMap<_, _>>,
                             from: CfgNode,
                             to: CfgNode,
                             kind: EdgeKind| {
            succ.entry(from).or_default().insert(to, kind);
            pred.entry(to).or_default().insert(from, kind);
            succ.entry(to).or_default();
            pred.entry(from).or_default();
        };

        let len = stmts.len();
        let fallthrough_target = |i: usize| if i + 1 < len { CfgNode::Stmt(i + 1) } else { CfgNode::Exit };

        if len == 0 {
            add_edge(&mut succ, &mut pred, CfgNode::Entry, CfgNode::Exit, EdgeKind::FallThrough);
        } else {
            add_edge(&mut succ, &mut pred, CfgNode::Entry, CfgNode::Stmt(0), EdgeKind::FallThrough);
        }

        for (i, stmt) in stmts.iter().enumerate() {
            let node = CfgNode::Stmt(i);
            match stmt {
                Stmt::Return { .. } => {
                    add_edge(&mut succ, &mut pred, node, CfgNode::Exit, EdgeKind::FallThrough);
                }
                Stmt::If { true_target, .. } => {
                    let true_node = if *true_target < len { CfgNode::Stmt(*true_target) } else { CfgNode::Exit };
                    add_edge(&mut succ, &mut pred, node, true_node, EdgeKind::IfTrue);
                    add_edge(&mut succ, &mut pred, node, fallthrough_target(i), EdgeKind::IfFalse);
                }
                Stmt::Switch { cases, default, .. } => {
                    for (val, target) in cases {
                        let target_node = if *target < len { CfgNode::Stmt(*target) } else { CfgNode::Exit };
                        add_edge(&mut succ, &mut pred, node, target_node, EdgeKind::SwitchCase(*val));
                    }
                    let default_node = if *default < len { CfgNode::Stmt(*default) } else { CfgNode::Exit };
                    add_edge(&mut succ, &mut pred, node, default_node, EdgeKind::SwitchDefault);
                }
                _ => {
                    add_edge(&mut succ, &mut pred, node, fallthrough_target(i), EdgeKind::FallThrough);
                }
            }
        }

        Self { succ, pred, stmt_count: len }
    }

    /// The virtual entry node.
    #[must_use]
    pub const fn entry(&self) -> CfgNode {
        CfgNode::Entry
    }

    /// The virtual exit node.
    #[must_use]
    pub const fn exit(&self) -> CfgNode {
        CfgNode::Exit
    }

    /// The number of real statements in this method.
    #[must_use]
    pub const fn stmt_count(&self) -> usize {
        self.stmt_count
    }

    /// All nodes, in program order (`Entry`, then statements by index, then `Exit`).
    pub fn nodes(&self) -> impl Iterator<Item = CfgNode> + '_ {
        self.succ.keys().copied()
    }

    /// The predecessors of `node`, in deterministic (sorted) order.
    pub fn preds_of(&self, node: CfgNode) -> impl Iterator<Item = CfgNode> + '_ {
        self.pred.get(&node).into_iter().flat_map(|m| m.keys().copied())
    }

    /// The successors of `node`, in deterministic (sorted) order.
    pub fn succs_of(&self, node: CfgNode) -> impl Iterator<Item = CfgNode> + '_ {
        self.succ.get(&node).into_iter().flat_map(|m| m.keys().copied())
    }

    /// The outgoing edges of `node`, each paired with its [`EdgeKind`].
    pub fn out_edges(&self, node: CfgNode) -> impl Iterator<Item = (CfgNode, EdgeKind)> + '_ {
        self.succ.get(&node).into_iter().flat_map(|m| m.iter().map(|(&n, &k)| (n, k)))
    }
}
