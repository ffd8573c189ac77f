use crate::{Node, ProgramGraph, types::OpKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary counts of a program graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub ops: usize,
    pub loops: usize,
    pub branches: usize,
    pub arrays: usize,
    pub literals: usize,
    /// Number of ops of each kind.
    pub op_kinds: BTreeMap<OpKind, usize>,
}

impl ProgramGraph {
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            ..Default::default()
        };
        for node in self.graph().node_weights() {
            match node {
                Node::Op(op) => {
                    stats.ops += 1;
                    *stats.op_kinds.entry(op.kind).or_default() += 1;
                }
                Node::Loop(_) => stats.loops += 1,
                Node::Branch(_) => stats.branches += 1,
                Node::Array(_) => stats.arrays += 1,
                Node::Literal(_) => stats.literals += 1,
            }
        }
        stats
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} edges ({} ops, {} loops, {} branches, {} arrays)",
            self.nodes,
            self.edges,
            self.ops,
            self.loops,
            self.branches,
            self.arrays
        )
    }
}
