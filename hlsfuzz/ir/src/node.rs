use crate::types::{OpKind, PortType, ResultType};
use hlsfuzz_utils::{Error, FuzzResult, Id};
use petgraph::graph::NodeIndex;

/// Stable handle to a node in a [`ProgramGraph`](crate::ProgramGraph).
pub type NodeRef = NodeIndex;

/// A loop bound: either a constant or the value of an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Literal(i64),
    Op(NodeRef),
}

/// An operation that produces a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpNode {
    pub name: Id,
    pub kind: OpKind,
    pub ty: ResultType,
}

/// Scheduling directives attached to a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPragmas {
    pub pipelined: bool,
    pub flattened: bool,
    pub unrolled: bool,
    pub fully_unrolled: bool,
    pub unroll_factor: u32,
}

impl Default for LoopPragmas {
    fn default() -> Self {
        Self {
            pipelined: false,
            flattened: false,
            unrolled: false,
            fully_unrolled: false,
            unroll_factor: 1,
        }
    }
}

/// A counted `for` loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopNode {
    pub name: Id,
    pub start: Bound,
    pub end: Bound,
    pub step: u32,
    pub pragmas: LoopPragmas,
}

impl LoopNode {
    /// Name of the induction variable declared by the loop header.
    pub fn loop_var(&self) -> String {
        format!("{}_loop_var", self.name)
    }

    /// Check that the unroll fields agree with each other:
    /// * a loop that is not unrolled has factor 1 and is not fully unrolled,
    /// * a partially unrolled loop has a factor greater than 1,
    /// * a fully unrolled loop keeps factor 1.
    pub fn check_pragma_status(&self) -> FuzzResult<()> {
        let LoopPragmas {
            unrolled,
            fully_unrolled,
            unroll_factor,
            ..
        } = self.pragmas;
        let ok = match (unrolled, fully_unrolled) {
            (false, false) => unroll_factor == 1,
            (false, true) => false,
            (true, false) => unroll_factor > 1,
            (true, true) => unroll_factor == 1,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::malformed_structure(format!(
                "loop `{}` has inconsistent unroll pragmas: \
                 unrolled={unrolled}, fully_unrolled={fully_unrolled}, \
                 factor={unroll_factor}",
                self.name
            )))
        }
    }
}

/// A two-way branch. Everything about it is stored on its edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub name: Id,
}

/// An array passed to the top-level function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayNode {
    pub name: Id,
    pub ty: ResultType,
    pub length: u32,
    pub port: PortType,
}

/// A constant used as an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralNode {
    pub name: Id,
    pub value: i64,
}

/// A vertex of the program graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Op(OpNode),
    Loop(LoopNode),
    Branch(BranchNode),
    Array(ArrayNode),
    Literal(LiteralNode),
}

impl Node {
    pub fn name(&self) -> Id {
        match self {
            Node::Op(op) => op.name,
            Node::Loop(l) => l.name,
            Node::Branch(br) => br.name,
            Node::Array(arr) => arr.name,
            Node::Literal(lit) => lit.name,
        }
    }

    pub fn is_op(&self) -> bool {
        matches!(self, Node::Op(_))
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Node::Loop(_))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// The op kind if this node is an op.
    pub fn op_kind(&self) -> Option<OpKind> {
        match self {
            Node::Op(op) => Some(op.kind),
            _ => None,
        }
    }

    /// True for ops whose value can be read by other nodes.
    pub fn produces_value(&self) -> bool {
        matches!(self, Node::Op(op) if op.kind != OpKind::Write)
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Node::Op(op) => format!("{} op `{}`", op.kind, op.name),
            Node::Loop(l) => format!("loop `{}`", l.name),
            Node::Branch(br) => format!("branch `{}`", br.name),
            Node::Array(arr) => format!("array `{}`", arr.name),
            Node::Literal(lit) => format!("literal `{}`", lit.name),
        }
    }

    /// Check the per-kind field rules.
    pub fn validate(&self) -> FuzzResult<()> {
        match self {
            Node::Op(op) => op.ty.validate(),
            Node::Loop(l) => {
                if l.step == 0 {
                    return Err(Error::invalid_argument(format!(
                        "loop `{}` must have a positive step",
                        l.name
                    )));
                }
                l.check_pragma_status()
            }
            Node::Array(arr) => {
                if arr.length == 0 {
                    return Err(Error::invalid_argument(format!(
                        "array `{}` must have at least one element",
                        arr.name
                    )));
                }
                arr.ty.validate()
            }
            Node::Branch(_) | Node::Literal(_) => Ok(()),
        }
    }
}

/// Everything needed to create a node except its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeParams {
    Op {
        kind: OpKind,
        ty: ResultType,
    },
    /// An op meant to be a function input. Only the name prefix differs.
    Input {
        kind: OpKind,
        ty: ResultType,
    },
    Loop {
        start: Bound,
        end: Bound,
        step: u32,
    },
    Branch,
    Array {
        ty: ResultType,
        length: u32,
        port: PortType,
    },
    Literal {
        value: i64,
    },
}

impl NodeParams {
    /// Prefix of the name given to the created node.
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeParams::Op {
                kind: OpKind::Visit,
                ..
            } => "visit_",
            NodeParams::Op {
                kind: OpKind::Write,
                ..
            } => "write_",
            NodeParams::Op { .. } => "op_",
            NodeParams::Input { .. } => "i",
            NodeParams::Loop { .. } => "loop_",
            NodeParams::Branch => "br_",
            NodeParams::Array { .. } => "array_",
            NodeParams::Literal { .. } => "const_",
        }
    }

    pub(crate) fn into_node(self, name: Id) -> Node {
        match self {
            NodeParams::Op { kind, ty } | NodeParams::Input { kind, ty } => {
                Node::Op(OpNode { name, kind, ty })
            }
            NodeParams::Loop { start, end, step } => Node::Loop(LoopNode {
                name,
                start,
                end,
                step,
                pragmas: LoopPragmas::default(),
            }),
            NodeParams::Branch => Node::Branch(BranchNode { name }),
            NodeParams::Array { ty, length, port } => Node::Array(ArrayNode {
                name,
                ty,
                length,
                port,
            }),
            NodeParams::Literal { value } => {
                Node::Literal(LiteralNode { name, value })
            }
        }
    }
}
