//! Graph intermediate representation for generated HLS programs.
//!
//! A [`ProgramGraph`] owns every node of a program in an arena addressed by
//! [`NodeRef`]s. Edges carry a typed [`EdgeRole`] so the code generator can
//! recover operands, loop and branch nesting, and array accesses without
//! looking at anything but the graph.
mod edge;
mod graph;
mod node;
mod stats;
mod types;
mod validate;

pub use edge::{ArrayRole, BoundSide, EdgeRole};
pub use graph::ProgramGraph;
pub use node::{
    ArrayNode, Bound, BranchNode, LiteralNode, LoopNode, LoopPragmas, Node,
    NodeParams, NodeRef, OpNode,
};
pub use stats::GraphStats;
pub use types::{
    NumericKind, OpKind, OverflowMode, PortType, ResultType, RoundingMode,
};

// Re-export utilities so that downstream crates only need one import.
pub use hlsfuzz_utils::{Error, FuzzResult, Id};
