use crate::{
    FuzzRng, OpDistribution, OpKindSampler, TypeConfig, TypeSampler,
    pick_centered, seeded_rng,
};
use hlsfuzz_ir::{
    ArrayRole, Bound, EdgeRole, NodeRef, OpKind, PortType, ProgramGraph,
};
use hlsfuzz_utils::{Error, FuzzResult};
use rand::{Rng, seq::SliceRandom};
use std::time::Instant;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// One random edit of the graph under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    AddArray,
    AddInput,
    AddOp,
    AddLoop,
    AddBranch,
    ArrayRead,
    ArrayWrite,
}

/// Knobs of the random builder.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Number of actions drawn.
    pub actions: usize,
    pub function_name: String,
    pub ops: OpDistribution,
    pub types: TypeConfig,
    pub array_lengths: Vec<u32>,
    pub array_port: PortType,
    pub loop_steps: Vec<u32>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            actions: 100,
            function_name: "top".to_string(),
            ops: OpDistribution::default(),
            types: TypeConfig::default(),
            array_lengths: vec![64, 128, 256, 512, 1024, 2048, 4096],
            array_port: PortType::default(),
            loop_steps: vec![1, 2, 4, 8],
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> FuzzResult<()> {
        if self.function_name.is_empty() {
            return Err(Error::invalid_argument(
                "function name must not be empty",
            ));
        }
        if self.array_lengths.is_empty() || self.array_lengths.contains(&0) {
            return Err(Error::invalid_argument(
                "array lengths must be a non-empty list of positive numbers",
            ));
        }
        if self.loop_steps.is_empty() || self.loop_steps.contains(&0) {
            return Err(Error::invalid_argument(
                "loop steps must be a non-empty list of positive numbers",
            ));
        }
        Ok(())
    }
}

/// Where a new node is placed.
#[derive(Debug, Clone, Copy)]
enum Placement {
    TopLevel,
    Loop(NodeRef),
    Branch(NodeRef, bool),
}

impl Placement {
    /// The enclosing loop or branch.
    fn block(self) -> Option<NodeRef> {
        match self {
            Placement::TopLevel => None,
            Placement::Loop(b) | Placement::Branch(b, _) => Some(b),
        }
    }
}

/// Grows a [`ProgramGraph`] through a fixed number of random actions. The
/// result only depends on the configuration and the seed.
pub struct RandomGraphBuilder {
    config: BuilderConfig,
    rng: FuzzRng,
    ops: OpKindSampler,
    types: TypeSampler,
    graph: ProgramGraph,
}

impl RandomGraphBuilder {
    pub fn new(config: BuilderConfig, seed: u64) -> FuzzResult<Self> {
        config.validate()?;
        Ok(Self {
            ops: OpKindSampler::new(config.ops)?,
            types: TypeSampler::new(&config.types)?,
            graph: ProgramGraph::with_function_name(&config.function_name)?,
            rng: seeded_rng(seed),
            config,
        })
    }

    /// Run every action and return the validated graph.
    pub fn build(mut self) -> FuzzResult<ProgramGraph> {
        let start = Instant::now();
        let actions = Action::iter().collect::<Vec<_>>();
        let mut performed = 0;
        for step in 0..self.config.actions {
            let action = *actions
                .choose(&mut self.rng)
                .ok_or_else(|| Error::misc("no builder actions"))?;
            if self.apply(action)? {
                performed += 1;
                log::debug!(
                    "Action {}/{}: {action}",
                    step + 1,
                    self.config.actions
                );
            } else {
                log::debug!(
                    "Action {}/{}: {action} skipped",
                    step + 1,
                    self.config.actions
                );
            }
            self.graph.check_invariants().map_err(|err| {
                err.with_post_msg(Some(format!("after {action}")))
            })?;
        }
        log::info!(
            "Generated `{}` in {:?} ({performed}/{} actions): {}",
            self.graph.function_name(),
            start.elapsed(),
            self.config.actions,
            self.graph.stats()
        );
        self.graph.validate()?;
        Ok(self.graph)
    }

    /// Perform `action`. Returns `false` when a required population is empty
    /// and the graph was left untouched.
    pub fn apply(&mut self, action: Action) -> FuzzResult<bool> {
        match action {
            Action::AddArray => self.add_array(),
            Action::AddInput => self.add_input(),
            Action::AddOp => self.add_op(),
            Action::AddLoop => self.add_loop(),
            Action::AddBranch => self.add_branch(),
            Action::ArrayRead => self.add_access(OpKind::Visit),
            Action::ArrayWrite => self.add_access(OpKind::Write),
        }
    }

    /// The graph built so far.
    pub fn graph(&self) -> &ProgramGraph {
        &self.graph
    }

    fn coin(&mut self) -> bool {
        self.rng.r#gen()
    }

    /// Decide whether a new node is nested, and in which loop or branch.
    fn placement(&mut self) -> FuzzResult<Placement> {
        let in_block = self.coin();
        let in_loop = self.coin();
        let parents = if in_loop {
            self.graph.loops()
        } else {
            self.graph.branches()
        };
        if !in_block || parents.is_empty() {
            return Ok(Placement::TopLevel);
        }
        if in_loop {
            Ok(Placement::Loop(pick_centered(&parents, &mut self.rng)?))
        } else {
            let direction = self.coin();
            let parent = pick_centered(&parents, &mut self.rng)?;
            Ok(Placement::Branch(parent, direction))
        }
    }

    /// The block `r` was placed in.
    fn placement_of(&self, r: NodeRef) -> Placement {
        self.graph
            .incoming(r)
            .into_iter()
            .find_map(|(parent, role)| match role {
                EdgeRole::LoopBody => Some(Placement::Loop(parent)),
                EdgeRole::BranchBody(dir) => {
                    Some(Placement::Branch(parent, dir))
                }
                _ => None,
            })
            .unwrap_or(Placement::TopLevel)
    }

    /// Values a statement placed at `placement` may read.
    fn candidates_at(&self, placement: Placement) -> FuzzResult<Vec<NodeRef>> {
        let block = placement.block();
        let mut visible = Vec::new();
        for c in self.graph.op_candidates() {
            if self.graph.visible_in(c, block)? {
                visible.push(c);
            }
        }
        Ok(visible)
    }

    fn attach(
        &mut self,
        node: NodeRef,
        placement: Placement,
    ) -> FuzzResult<()> {
        match placement {
            Placement::TopLevel => Ok(()),
            Placement::Loop(l) => {
                self.graph.connect(l, node, EdgeRole::LoopBody)
            }
            Placement::Branch(br, dir) => {
                self.graph.connect(br, node, EdgeRole::BranchBody(dir))
            }
        }
    }

    fn add_array(&mut self) -> FuzzResult<bool> {
        let ty = self.types.sample(&mut self.rng);
        let length = *self
            .config
            .array_lengths
            .choose(&mut self.rng)
            .ok_or_else(|| Error::invalid_argument("no array lengths"))?;
        self.graph.add_array(ty, length, self.config.array_port)?;
        Ok(true)
    }

    fn add_input(&mut self) -> FuzzResult<bool> {
        let ty = self.types.sample(&mut self.rng);
        let kind = self.ops.sample(&mut self.rng);
        self.graph.add_input(kind, ty)?;
        Ok(true)
    }

    fn add_op(&mut self) -> FuzzResult<bool> {
        let ty = self.types.sample(&mut self.rng);
        let kind = self.ops.sample(&mut self.rng);
        let placement = self.placement()?;
        let candidates = self.candidates_at(placement)?;

        // A top-level op with nothing to read becomes a free input.
        if candidates.is_empty() {
            if let Placement::TopLevel = placement {
                self.graph.add_op(kind, ty)?;
                return Ok(true);
            }
            return Err(Error::malformed_structure(
                "nested op without operand candidates",
            ));
        }
        let operands = (0..kind.arity())
            .map(|_| pick_centered(&candidates, &mut self.rng))
            .collect::<FuzzResult<Vec<_>>>()?;
        let op = self.graph.add_op(kind, ty)?;
        for (slot, src) in operands.into_iter().enumerate() {
            self.graph.connect(src, op, EdgeRole::Operand(slot as u8))?;
        }
        self.attach(op, placement)?;
        Ok(true)
    }

    fn add_loop(&mut self) -> FuzzResult<bool> {
        if self.graph.op_candidates().is_empty() {
            return Ok(false);
        }
        let placement = self.placement()?;
        let candidates = self.candidates_at(placement)?;
        let start = if self.coin() {
            Bound::Op(self.choose(&candidates)?)
        } else {
            Bound::Literal(self.rng.gen_range(0..=10))
        };
        let end = if self.coin() {
            Bound::Op(self.choose(&candidates)?)
        } else {
            Bound::Literal(match start {
                Bound::Literal(s) => self.rng.gen_range(s + 1..=s + 100),
                Bound::Op(_) => self.rng.gen_range(10..=100),
            })
        };
        let steps = self.config.loop_steps.clone();
        let step = self.choose(&steps)?;
        let l = self.graph.add_loop(start, end, step)?;
        self.attach(l, placement)?;
        Ok(true)
    }

    fn add_branch(&mut self) -> FuzzResult<bool> {
        if self.graph.op_candidates().is_empty() {
            return Ok(false);
        }
        let placement = self.placement()?;
        let candidates = self.candidates_at(placement)?;
        let cond = pick_centered(&candidates, &mut self.rng)?;
        let br = self.graph.add_branch()?;
        self.graph.connect(cond, br, EdgeRole::Condition)?;
        self.attach(br, placement)?;
        Ok(true)
    }

    /// Add a VISIT or WRITE of a random array. The address is a fresh
    /// literal, an op or a loop variable. Accesses addressed by a loop
    /// variable are nested in that loop, and accesses addressed by an op
    /// share the op's block.
    fn add_access(&mut self, kind: OpKind) -> FuzzResult<bool> {
        let candidates = self.graph.op_candidates();
        let arrays = self.graph.arrays();
        if candidates.len() < 2 || arrays.is_empty() {
            return Ok(false);
        }
        let arr = pick_centered(&arrays, &mut self.rng)?;
        let array = self.graph.array(arr)?;
        let (ty, length) = (array.ty, array.length);
        let index = i64::from(self.rng.gen_range(0..length));

        let mut choices = vec![None];
        choices.extend(candidates.iter().copied().map(Some));
        choices.extend(self.graph.loops().into_iter().map(Some));
        let address = match pick_centered(&choices, &mut self.rng)? {
            Some(r) => r,
            None => self.graph.add_literal(index)?,
        };
        let placement = if self.graph.node(address)?.is_loop() {
            Placement::Loop(address)
        } else {
            self.placement_of(address)
        };
        let value = if kind == OpKind::Write {
            let visible = self.candidates_at(placement)?;
            Some(pick_centered(&visible, &mut self.rng)?)
        } else {
            None
        };

        let access = self.graph.add_op(kind, ty)?;
        self.graph.connect(
            address,
            access,
            EdgeRole::Array(ArrayRole::Address),
        )?;
        match value {
            Some(v) => {
                self.graph.connect(
                    v,
                    access,
                    EdgeRole::Array(ArrayRole::WriteValue),
                )?;
                self.graph.connect(
                    access,
                    arr,
                    EdgeRole::Array(ArrayRole::Array),
                )?;
            }
            None => self.graph.connect(
                arr,
                access,
                EdgeRole::Array(ArrayRole::Array),
            )?,
        }
        self.attach(access, placement)?;
        Ok(true)
    }

    fn choose<T: Copy>(&mut self, items: &[T]) -> FuzzResult<T> {
        items
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| {
                Error::invalid_argument("cannot choose from an empty list")
            })
    }
}
