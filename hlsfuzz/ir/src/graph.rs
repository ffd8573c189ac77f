use crate::edge::{ArrayRole, BoundSide, EdgeRole};
use crate::node::{
    ArrayNode, Bound, LoopNode, Node, NodeParams, NodeRef, OpNode,
};
use crate::types::{OpKind, PortType, ResultType};
use hlsfuzz_utils::{Error, FuzzResult, Id, NameGenerator};
use itertools::Itertools;
use petgraph::{
    Direction::{Incoming, Outgoing},
    algo,
    graph::DiGraph,
    graphmap::DiGraphMap,
    visit::EdgeRef,
};
use std::collections::HashMap;

/// The program being generated: an arena of [`Node`]s connected by
/// role-tagged edges.
///
/// Nodes are only created through [`ProgramGraph::add_node`] (or the
/// kind-specific helpers built on top of it), which assigns each node a
/// unique name. Nodes are never removed, so a [`NodeRef`] stays valid for the
/// lifetime of the graph and the order of `NodeRef`s is the creation order.
#[derive(Debug)]
pub struct ProgramGraph {
    graph: DiGraph<Node, EdgeRole>,
    names: NameGenerator,
    function_name: Id,
}

impl Default for ProgramGraph {
    fn default() -> Self {
        Self {
            graph: DiGraph::new(),
            names: NameGenerator::default(),
            function_name: Id::from("top"),
        }
    }
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph whose generated function is called `name`.
    pub fn with_function_name(name: &str) -> FuzzResult<Self> {
        let mut graph = Self::default();
        graph.set_function_name(name)?;
        Ok(graph)
    }

    pub fn function_name(&self) -> Id {
        self.function_name
    }

    pub fn set_function_name(&mut self, name: &str) -> FuzzResult<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument(
                "function name must not be empty",
            ));
        }
        self.function_name = Id::from(name);
        Ok(())
    }

    /// Read-only access to the underlying petgraph graph.
    pub fn graph(&self) -> &DiGraph<Node, EdgeRole> {
        &self.graph
    }

    // ===================== Node creation =====================

    /// Name and insert a new node.
    ///
    /// Loops whose bounds are ops also get a [`EdgeRole::LoopBound`] edge from
    /// every bound op so that bounds are computed before the loop runs.
    pub fn add_node(&mut self, params: NodeParams) -> FuzzResult<NodeRef> {
        if matches!(&params, NodeParams::Input { kind, .. } if kind.is_memory())
        {
            return Err(Error::invalid_argument(
                "function inputs cannot be array accesses",
            ));
        }
        let prefix = params.prefix();
        let mut node = params.into_node(Id::default());
        node.validate()?;
        let bounds = match &node {
            Node::Loop(l) => {
                vec![(BoundSide::Start, l.start), (BoundSide::End, l.end)]
            }
            _ => vec![],
        };
        for (_, bound) in &bounds {
            if let Bound::Op(r) = bound {
                let bound_node = self.node(*r)?;
                if !bound_node.produces_value() {
                    return Err(Error::invalid_argument(format!(
                        "loop bound must be a value-producing op, found {}",
                        bound_node.describe()
                    )));
                }
            }
        }

        let name = self.names.gen_name(prefix);
        node.set_name(name);
        let idx = self.graph.add_node(node);
        for (side, bound) in bounds {
            if let Bound::Op(r) = bound {
                self.connect(r, idx, EdgeRole::LoopBound(side))?;
            }
        }
        log::trace!("Added node `{name}`");
        Ok(idx)
    }

    pub fn add_op(
        &mut self,
        kind: OpKind,
        ty: ResultType,
    ) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Op { kind, ty })
    }

    pub fn add_input(
        &mut self,
        kind: OpKind,
        ty: ResultType,
    ) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Input { kind, ty })
    }

    pub fn add_loop(
        &mut self,
        start: Bound,
        end: Bound,
        step: u32,
    ) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Loop { start, end, step })
    }

    pub fn add_branch(&mut self) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Branch)
    }

    pub fn add_array(
        &mut self,
        ty: ResultType,
        length: u32,
        port: PortType,
    ) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Array { ty, length, port })
    }

    pub fn add_literal(&mut self, value: i64) -> FuzzResult<NodeRef> {
        self.add_node(NodeParams::Literal { value })
    }

    // ===================== Edge creation =====================

    /// Add an edge with `role` from `src` to `dst`.
    ///
    /// An edge with the same role between the same pair is never replaced:
    /// connecting it twice is an error. Edges with different roles between
    /// the same pair coexist and are queried separately.
    pub fn connect(
        &mut self,
        src: NodeRef,
        dst: NodeRef,
        role: EdgeRole,
    ) -> FuzzResult<()> {
        let (src_node, dst_node) = (self.node(src)?, self.node(dst)?);
        if src == dst {
            return Err(Error::invalid_argument(format!(
                "cannot connect {} to itself",
                src_node.describe()
            )));
        }
        Self::check_role(src_node, dst_node, role)?;
        if self
            .graph
            .edges_connecting(src, dst)
            .any(|e| *e.weight() == role)
        {
            return Err(Error::malformed_structure(format!(
                "`{role}` edge from `{}` to `{}` already exists",
                src_node.name(),
                dst_node.name()
            )));
        }
        self.graph.add_edge(src, dst, role);
        Ok(())
    }

    /// Check that `role` makes sense between nodes of these kinds.
    fn check_role(src: &Node, dst: &Node, role: EdgeRole) -> FuzzResult<()> {
        let can_nest = |n: &Node| n.is_op() || n.is_loop() || n.is_branch();
        let is_kind = |n: &Node, kind: OpKind| n.op_kind() == Some(kind);
        let ok = match role {
            EdgeRole::Operand(slot) => {
                src.produces_value()
                    && matches!(dst.op_kind(),
                        Some(k) if (slot as usize) < k.arity())
            }
            EdgeRole::LoopBody => src.is_loop() && can_nest(dst),
            EdgeRole::BranchBody(_) => src.is_branch() && can_nest(dst),
            EdgeRole::LoopBound(_) => src.produces_value() && dst.is_loop(),
            EdgeRole::Condition => src.produces_value() && dst.is_branch(),
            EdgeRole::Array(ArrayRole::Array) => {
                (src.is_array() && is_kind(dst, OpKind::Visit))
                    || (is_kind(src, OpKind::Write) && dst.is_array())
            }
            EdgeRole::Array(ArrayRole::Address) => {
                (src.produces_value() || src.is_loop() || src.is_literal())
                    && matches!(dst.op_kind(), Some(k) if k.is_memory())
            }
            EdgeRole::Array(ArrayRole::WriteValue) => {
                src.produces_value() && is_kind(dst, OpKind::Write)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "cannot connect {} to {} as `{role}`",
                src.describe(),
                dst.describe()
            )))
        }
    }

    // ===================== Node queries =====================

    pub fn node(&self, r: NodeRef) -> FuzzResult<&Node> {
        self.graph.node_weight(r).ok_or_else(|| {
            Error::invalid_argument(format!("no node with index {}", r.index()))
        })
    }

    pub fn op(&self, r: NodeRef) -> FuzzResult<&OpNode> {
        match self.node(r)? {
            Node::Op(op) => Ok(op),
            other => Err(Error::invalid_argument(format!(
                "expected an op, found {}",
                other.describe()
            ))),
        }
    }

    pub fn loop_node(&self, r: NodeRef) -> FuzzResult<&LoopNode> {
        match self.node(r)? {
            Node::Loop(l) => Ok(l),
            other => Err(Error::invalid_argument(format!(
                "expected a loop, found {}",
                other.describe()
            ))),
        }
    }

    pub fn loop_node_mut(&mut self, r: NodeRef) -> FuzzResult<&mut LoopNode> {
        match self.graph.node_weight_mut(r) {
            Some(Node::Loop(l)) => Ok(l),
            Some(other) => Err(Error::invalid_argument(format!(
                "expected a loop, found {}",
                other.describe()
            ))),
            None => Err(Error::invalid_argument(format!(
                "no node with index {}",
                r.index()
            ))),
        }
    }

    pub fn array(&self, r: NodeRef) -> FuzzResult<&ArrayNode> {
        match self.node(r)? {
            Node::Array(arr) => Ok(arr),
            other => Err(Error::invalid_argument(format!(
                "expected an array, found {}",
                other.describe()
            ))),
        }
    }

    /// All nodes in creation order.
    pub fn node_refs(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.graph.node_indices()
    }

    fn filter_nodes<F>(&self, pred: F) -> Vec<NodeRef>
    where
        F: Fn(&Node) -> bool,
    {
        self.graph
            .node_indices()
            .filter(|idx| pred(&self.graph[*idx]))
            .collect()
    }

    pub fn ops(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::is_op)
    }

    /// Ops whose value can be read: every op except WRITEs.
    pub fn op_candidates(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::produces_value)
    }

    pub fn loops(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::is_loop)
    }

    pub fn branches(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::is_branch)
    }

    pub fn arrays(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::is_array)
    }

    pub fn literals(&self) -> Vec<NodeRef> {
        self.filter_nodes(Node::is_literal)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Kinds of all ops in creation order.
    pub fn op_kind_sequence(&self) -> Vec<OpKind> {
        self.graph
            .node_weights()
            .filter_map(Node::op_kind)
            .collect()
    }

    // ===================== Edge queries =====================

    /// Incoming edges of `r` in insertion order.
    pub fn incoming(&self, r: NodeRef) -> Vec<(NodeRef, EdgeRole)> {
        self.graph
            .edges_directed(r, Incoming)
            .map(|e| (e.id(), e.source(), *e.weight()))
            .sorted_by_key(|(id, ..)| *id)
            .map(|(_, src, role)| (src, role))
            .collect()
    }

    /// Outgoing edges of `r` in insertion order.
    pub fn outgoing(&self, r: NodeRef) -> Vec<(NodeRef, EdgeRole)> {
        self.graph
            .edges_directed(r, Outgoing)
            .map(|e| (e.id(), e.target(), *e.weight()))
            .sorted_by_key(|(id, ..)| *id)
            .map(|(_, dst, role)| (dst, role))
            .collect()
    }

    /// Distinct predecessors of `r` in creation order.
    pub fn predecessors(&self, r: NodeRef) -> Vec<NodeRef> {
        self.graph
            .neighbors_directed(r, Incoming)
            .sorted()
            .dedup()
            .collect()
    }

    /// Distinct successors of `r` in creation order.
    pub fn successors(&self, r: NodeRef) -> Vec<NodeRef> {
        self.graph
            .neighbors_directed(r, Outgoing)
            .sorted()
            .dedup()
            .collect()
    }

    /// Sources of the incoming edges of `dst` with exactly `role`.
    pub fn sources_of(&self, dst: NodeRef, role: EdgeRole) -> Vec<NodeRef> {
        self.incoming(dst)
            .into_iter()
            .filter_map(|(src, r)| (r == role).then_some(src))
            .collect()
    }

    /// Targets of the outgoing edges of `src` with exactly `role`.
    pub fn targets_of(&self, src: NodeRef, role: EdgeRole) -> Vec<NodeRef> {
        self.outgoing(src)
            .into_iter()
            .filter_map(|(dst, r)| (r == role).then_some(dst))
            .collect()
    }

    /// The unique source of an incoming `role` edge of `dst`.
    pub fn single_source(
        &self,
        dst: NodeRef,
        role: EdgeRole,
    ) -> FuzzResult<NodeRef> {
        match self.sources_of(dst, role).as_slice() {
            [src] => Ok(*src),
            srcs => Err(Error::malformed_structure(format!(
                "{} must have exactly one `{role}` predecessor, found {}",
                self.node(dst)?.describe(),
                srcs.len()
            ))),
        }
    }

    /// Loops and branches that nest `r` inside them.
    pub fn structural_parents(&self, r: NodeRef) -> Vec<NodeRef> {
        self.incoming(r)
            .into_iter()
            .filter_map(|(src, role)| role.is_structural().then_some(src))
            .collect()
    }

    /// The loop or branch `r` executes inside, if any.
    pub fn structural_parent(&self, r: NodeRef) -> FuzzResult<Option<NodeRef>> {
        match self.structural_parents(r).as_slice() {
            [] => Ok(None),
            [parent] => Ok(Some(*parent)),
            parents => Err(Error::malformed_structure(format!(
                "node `{}` has {} structural parents: {}",
                self.node(r)?.name(),
                parents.len(),
                parents.iter().map(|p| self.graph[*p].name()).join(", ")
            ))),
        }
    }

    /// Nodes nested directly inside `r`.
    pub fn structural_children(&self, r: NodeRef) -> Vec<NodeRef> {
        self.outgoing(r)
            .into_iter()
            .filter_map(|(dst, role)| role.is_structural().then_some(dst))
            .collect()
    }

    /// Topologically order the nodes selected by `keep`, considering only the
    /// edges between selected nodes.
    pub fn induced_order<F>(&self, keep: F) -> FuzzResult<Vec<NodeRef>>
    where
        F: Fn(NodeRef, &Node) -> bool,
    {
        let sub = self.graph.filter_map(
            |idx, node| keep(idx, node).then_some(idx),
            |_, role| Some(*role),
        );
        algo::toposort(&sub, None)
            .map(|order| order.into_iter().map(|idx| sub[idx]).collect())
            .map_err(|cycle| {
                Error::malformed_structure(format!(
                    "graph contains a cycle through `{}`",
                    self.graph[sub[cycle.node_id()]].name()
                ))
            })
    }

    /// Order the statements of one nesting level.
    ///
    /// `members` are the nodes of the level: the roots of the program, or the
    /// children of one loop or branch. Every node nested below a member is
    /// represented by that member, and each non-structural edge between two
    /// different representatives is lifted onto them. A value produced before
    /// a block and read inside it therefore orders the whole block after the
    /// producer.
    pub fn block_order(
        &self,
        members: &[NodeRef],
    ) -> FuzzResult<Vec<NodeRef>> {
        let mut level = DiGraphMap::<NodeRef, ()>::new();
        for m in members {
            level.add_node(*m);
        }
        let mut reps = HashMap::new();
        for r in self.node_refs() {
            if let Some(rep) = self.representative(r, &level)? {
                reps.insert(r, rep);
            }
        }
        for edge in self.graph.edge_references() {
            if edge.weight().is_structural() {
                continue;
            }
            if let (Some(src), Some(dst)) =
                (reps.get(&edge.source()), reps.get(&edge.target()))
            {
                if src != dst {
                    level.add_edge(*src, *dst, ());
                }
            }
        }
        algo::toposort(&level, None).map_err(|cycle| {
            Error::malformed_structure(format!(
                "statements around `{}` read each other's values",
                self.graph[cycle.node_id()].name()
            ))
        })
    }

    /// The member of `level` that `r` is nested in, or `r` itself.
    fn representative(
        &self,
        r: NodeRef,
        level: &DiGraphMap<NodeRef, ()>,
    ) -> FuzzResult<Option<NodeRef>> {
        let mut cur = r;
        loop {
            if level.contains_node(cur) {
                return Ok(Some(cur));
            }
            match self.structural_parent(cur)? {
                Some(parent) => cur = parent,
                None => return Ok(None),
            }
        }
    }

    /// Whether `r` may read `src` without leaving the scope `src` is
    /// assigned in.
    pub fn in_scope(&self, src: NodeRef, r: NodeRef) -> FuzzResult<bool> {
        self.visible_in(src, self.structural_parent(r)?)
    }

    /// Whether a statement placed in `block` (`None` for the top level) may
    /// read `src`: `src` sits at the top level, in `block` or in one of the
    /// blocks enclosing it.
    pub fn visible_in(
        &self,
        src: NodeRef,
        block: Option<NodeRef>,
    ) -> FuzzResult<bool> {
        let Some(home) = self.structural_parent(src)? else {
            return Ok(true);
        };
        let mut cur = block;
        while let Some(b) = cur {
            if b == home {
                return Ok(true);
            }
            cur = self.structural_parent(b)?;
        }
        Ok(false)
    }

    // ===================== Cloning =====================

    /// Copy every node and rebuild every edge against the copied nodes.
    /// Names are preserved and the copy continues the same name counters.
    pub fn deep_clone(&self) -> Self {
        let mut graph = DiGraph::with_capacity(
            self.graph.node_count(),
            self.graph.edge_count(),
        );
        let mut remap: HashMap<NodeRef, NodeRef> = HashMap::new();
        for idx in self.graph.node_indices() {
            let new_idx = graph.add_node(self.graph[idx].clone());
            remap.insert(idx, new_idx);
        }
        for node in graph.node_weights_mut() {
            if let Node::Loop(l) = node {
                for bound in [&mut l.start, &mut l.end] {
                    if let Bound::Op(r) = bound {
                        *r = remap[&*r];
                    }
                }
            }
        }
        for edge in self.graph.edge_references() {
            graph.add_edge(
                remap[&edge.source()],
                remap[&edge.target()],
                *edge.weight(),
            );
        }
        Self {
            graph,
            names: self.names.clone(),
            function_name: self.function_name,
        }
    }
}

impl Node {
    /// Names are assigned exactly once, by [`ProgramGraph::add_node`].
    fn set_name(&mut self, name: Id) {
        match self {
            Node::Op(op) => op.name = name,
            Node::Loop(l) => l.name = name,
            Node::Branch(br) => br.name = name,
            Node::Array(arr) => arr.name = name,
            Node::Literal(lit) => lit.name = name,
        }
    }
}
