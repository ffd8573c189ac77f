use std::fmt::Display;

/// Which bound of a loop an op computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundSide {
    Start,
    End,
}

/// Role of an edge that touches an array access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayRole {
    /// `array -> VISIT` or `WRITE -> array`.
    Array,
    /// Index of the access. The source is an op, a loop or a literal.
    Address,
    /// Value stored by a WRITE.
    WriteValue,
}

/// The role an edge plays in the program.
///
/// Several edges may connect the same ordered pair of nodes as long as their
/// roles differ, so every query on the graph is keyed by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeRole {
    /// Producer feeds operand slot `n` of the consumer.
    Operand(u8),
    /// Target executes inside the body of the source loop.
    LoopBody,
    /// Target executes in the `true` or `false` arm of the source branch.
    BranchBody(bool),
    /// Source op computes a bound of the target loop.
    LoopBound(BoundSide),
    /// Source op is the condition of the target branch.
    Condition,
    Array(ArrayRole),
}

impl EdgeRole {
    /// Structural edges nest their target inside the source.
    pub fn is_structural(&self) -> bool {
        matches!(self, EdgeRole::LoopBody | EdgeRole::BranchBody(_))
    }
}

impl Display for EdgeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeRole::Operand(n) => write!(f, "operand{n}"),
            EdgeRole::LoopBody => write!(f, "loop"),
            EdgeRole::BranchBody(dir) => write!(f, "branch({dir})"),
            EdgeRole::LoopBound(BoundSide::Start) => write!(f, "start"),
            EdgeRole::LoopBound(BoundSide::End) => write!(f, "end"),
            EdgeRole::Condition => write!(f, "condition"),
            EdgeRole::Array(ArrayRole::Array) => write!(f, "array"),
            EdgeRole::Array(ArrayRole::Address) => write!(f, "address"),
            EdgeRole::Array(ArrayRole::WriteValue) => write!(f, "write_value"),
        }
    }
}
