//! Graph-wide invariant checks.
use crate::{
    ArrayRole, Bound, BoundSide, EdgeRole, NodeRef, OpKind, ProgramGraph,
};
use hlsfuzz_utils::{Error, FuzzResult};
use itertools::Itertools;

impl ProgramGraph {
    /// Validate the graph:
    /// 1. report nodes without any edge,
    /// 2. check the per-node field rules,
    /// 3. check every node has at most one structural parent,
    /// 4. check arrays are only written by WRITEs and read by VISITs,
    /// 5. check every branch splits its successors into two disjoint arms.
    ///
    /// Acyclicity is checked by the code generator when it orders the graph;
    /// use [`ProgramGraph::check_invariants`] to check everything at once.
    pub fn validate(&self) -> FuzzResult<()> {
        for r in self.standalone_nodes() {
            log::warn!("Standalone node `{}`", self.graph()[r].name());
        }
        self.check_fatal()
    }

    /// Every fatal check, including acyclicity. Silent on standalone nodes.
    pub fn check_invariants(&self) -> FuzzResult<()> {
        self.check_fatal()?;
        self.check_acyclic()
    }

    /// Nodes that have no incoming and no outgoing edges.
    pub fn standalone_nodes(&self) -> Vec<NodeRef> {
        self.node_refs()
            .filter(|r| {
                self.graph().neighbors_undirected(*r).next().is_none()
            })
            .collect()
    }

    /// The graph without its arrays must be acyclic.
    pub fn check_acyclic(&self) -> FuzzResult<()> {
        self.induced_order(|_, node| !node.is_array()).map(|_| ())
    }

    fn check_fatal(&self) -> FuzzResult<()> {
        for r in self.node_refs() {
            self.graph()[r].validate()?;
            self.structural_parent(r)?;
        }
        self.check_loop_bounds()?;
        self.check_array_discipline()?;
        self.check_branch_partitions()
    }

    /// Op bounds of a loop are mirrored by exactly one bound edge.
    fn check_loop_bounds(&self) -> FuzzResult<()> {
        for l in self.loops() {
            let node = self.loop_node(l)?;
            for (side, bound) in
                [(BoundSide::Start, node.start), (BoundSide::End, node.end)]
            {
                let sources = self.sources_of(l, EdgeRole::LoopBound(side));
                let ok = match bound {
                    Bound::Literal(_) => sources.is_empty(),
                    Bound::Op(op) => sources == [op],
                };
                if !ok {
                    return Err(Error::malformed_structure(format!(
                        "loop `{}` bound edges do not match its {side:?} bound",
                        node.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_array_discipline(&self) -> FuzzResult<()> {
        for arr in self.arrays() {
            let name = self.graph()[arr].name();
            for (src, role) in self.incoming(arr) {
                let node = &self.graph()[src];
                if role != EdgeRole::Array(ArrayRole::Array)
                    || node.op_kind() != Some(OpKind::Write)
                {
                    return Err(Error::malformed_structure(format!(
                        "array `{name}` is written by {} through a \
                         `{role}` edge",
                        node.describe()
                    )));
                }
            }
            for (dst, role) in self.outgoing(arr) {
                let node = &self.graph()[dst];
                if role != EdgeRole::Array(ArrayRole::Array)
                    || node.op_kind() != Some(OpKind::Visit)
                {
                    return Err(Error::malformed_structure(format!(
                        "array `{name}` is read by {} through a `{role}` edge",
                        node.describe()
                    )));
                }
            }
        }

        // Every access is fully connected.
        for op in self.ops() {
            match self.graph()[op].op_kind() {
                Some(OpKind::Visit) => {
                    self.single_source(op, EdgeRole::Array(ArrayRole::Array))?;
                    self.single_source(
                        op,
                        EdgeRole::Array(ArrayRole::Address),
                    )?;
                }
                Some(OpKind::Write) => {
                    self.single_target(op)?;
                    self.single_source(
                        op,
                        EdgeRole::Array(ArrayRole::Address),
                    )?;
                    self.single_source(
                        op,
                        EdgeRole::Array(ArrayRole::WriteValue),
                    )?;
                }
                _ => (),
            }
        }
        Ok(())
    }

    /// The array written by a WRITE.
    pub fn single_target(&self, write: NodeRef) -> FuzzResult<NodeRef> {
        let role = EdgeRole::Array(ArrayRole::Array);
        match self.targets_of(write, role).as_slice() {
            [arr] => Ok(*arr),
            arrs => Err(Error::malformed_structure(format!(
                "{} must write exactly one array, found {}",
                self.node(write)?.describe(),
                arrs.len()
            ))),
        }
    }

    /// Each branch has one condition, and each of its successors sits in
    /// exactly one arm.
    fn check_branch_partitions(&self) -> FuzzResult<()> {
        for br in self.branches() {
            self.single_source(br, EdgeRole::Condition)?;
            self.branch_arms(br)?;
        }
        Ok(())
    }

    /// Split the successors of a branch into its `true` and `false` arms.
    pub fn branch_arms(
        &self,
        br: NodeRef,
    ) -> FuzzResult<(Vec<NodeRef>, Vec<NodeRef>)> {
        let name = self.node(br)?.name();
        let outgoing = self.outgoing(br);
        if let Some((_, role)) =
            outgoing.iter().find(|(_, r)| !matches!(r, EdgeRole::BranchBody(_)))
        {
            return Err(Error::malformed_structure(format!(
                "branch `{name}` has an outgoing `{role}` edge"
            )));
        }
        let (taken, not_taken): (Vec<_>, Vec<_>) = outgoing
            .into_iter()
            .partition(|(_, role)| *role == EdgeRole::BranchBody(true));
        let taken = taken.into_iter().map(|(n, _)| n).collect_vec();
        let not_taken = not_taken.into_iter().map(|(n, _)| n).collect_vec();

        let successors = self.successors(br);
        if let Some(both) = taken.iter().find(|n| not_taken.contains(*n)) {
            return Err(Error::malformed_structure(format!(
                "`{}` is in both arms of branch `{name}`",
                self.graph()[*both].name()
            )));
        }
        if taken.len() + not_taken.len() != successors.len() {
            return Err(Error::malformed_structure(format!(
                "arms of branch `{name}` do not cover its successors"
            )));
        }
        Ok((taken, not_taken))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn ty() -> ResultType {
        ResultType::int(8)
    }

    #[test]
    fn standalone_nodes_are_reported_not_fatal() {
        let mut g = ProgramGraph::new();
        let a = g.add_input(OpKind::Add, ty()).unwrap();
        assert_eq!(g.standalone_nodes(), vec![a]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn two_structural_parents_are_fatal() {
        let mut g = ProgramGraph::new();
        let i = g.add_input(OpKind::Add, ty()).unwrap();
        let l = g.add_loop(Bound::Literal(0), Bound::Literal(3), 1).unwrap();
        let br = g.add_branch().unwrap();
        g.connect(i, br, EdgeRole::Condition).unwrap();
        let op = g.add_op(OpKind::Not, ty()).unwrap();
        g.connect(i, op, EdgeRole::Operand(0)).unwrap();
        g.connect(l, op, EdgeRole::LoopBody).unwrap();
        assert!(g.validate().is_ok());
        g.connect(br, op, EdgeRole::BranchBody(true)).unwrap();
        assert!(g.validate().unwrap_err().is_structural());
    }

    #[test]
    fn branch_arms_must_be_disjoint() {
        let mut g = ProgramGraph::new();
        let i = g.add_input(OpKind::Add, ty()).unwrap();
        let br = g.add_branch().unwrap();
        g.connect(i, br, EdgeRole::Condition).unwrap();
        let t = g.add_op(OpKind::Not, ty()).unwrap();
        let f = g.add_op(OpKind::Not, ty()).unwrap();
        g.connect(i, t, EdgeRole::Operand(0)).unwrap();
        g.connect(i, f, EdgeRole::Operand(0)).unwrap();
        g.connect(br, t, EdgeRole::BranchBody(true)).unwrap();
        g.connect(br, f, EdgeRole::BranchBody(false)).unwrap();
        assert_eq!(g.branch_arms(br).unwrap(), (vec![t], vec![f]));
        g.check_invariants().unwrap();

        g.connect(br, t, EdgeRole::BranchBody(false)).unwrap();
        assert!(g.branch_arms(br).unwrap_err().is_structural());
    }

    #[test]
    fn branch_needs_a_condition() {
        let mut g = ProgramGraph::new();
        g.add_branch().unwrap();
        assert!(g.validate().unwrap_err().is_structural());
    }

    #[test]
    fn incomplete_accesses_are_fatal() {
        let mut g = ProgramGraph::new();
        let arr = g.add_array(ty(), 64, PortType::Ram1P).unwrap();
        let idx = g.add_literal(3).unwrap();
        let v = g.add_op(OpKind::Visit, ty()).unwrap();
        g.connect(arr, v, EdgeRole::Array(ArrayRole::Array)).unwrap();
        assert!(g.validate().is_err());
        g.connect(idx, v, EdgeRole::Array(ArrayRole::Address)).unwrap();
        g.check_invariants().unwrap();

        let w = g.add_op(OpKind::Write, ty()).unwrap();
        g.connect(v, w, EdgeRole::Array(ArrayRole::WriteValue)).unwrap();
        g.connect(idx, w, EdgeRole::Array(ArrayRole::Address)).unwrap();
        assert!(g.validate().is_err());
        g.connect(w, arr, EdgeRole::Array(ArrayRole::Array)).unwrap();
        g.check_invariants().unwrap();
    }

    #[test]
    fn cycles_outside_arrays_are_fatal() {
        let mut g = ProgramGraph::new();
        let a = g.add_op(OpKind::Not, ty()).unwrap();
        let b = g.add_op(OpKind::Not, ty()).unwrap();
        g.connect(a, b, EdgeRole::Operand(0)).unwrap();
        g.check_acyclic().unwrap();
        g.connect(b, a, EdgeRole::Operand(0)).unwrap();
        assert!(g.validate().is_ok());
        assert!(g.check_invariants().unwrap_err().is_structural());
    }

    #[test]
    fn array_round_trip_is_not_a_cycle() {
        let mut g = ProgramGraph::new();
        let arr = g.add_array(ty(), 64, PortType::Ram1P).unwrap();
        let w = g.add_op(OpKind::Write, ty()).unwrap();
        let v = g.add_op(OpKind::Visit, ty()).unwrap();
        let i = g.add_input(OpKind::Add, ty()).unwrap();
        g.connect(i, w, EdgeRole::Array(ArrayRole::WriteValue)).unwrap();
        g.connect(v, w, EdgeRole::Array(ArrayRole::Address)).unwrap();
        g.connect(w, arr, EdgeRole::Array(ArrayRole::Array)).unwrap();
        g.connect(arr, v, EdgeRole::Array(ArrayRole::Array)).unwrap();
        g.connect(i, v, EdgeRole::Array(ArrayRole::Address)).unwrap();
        g.check_invariants().unwrap();
    }
}
