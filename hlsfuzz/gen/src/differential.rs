use crate::{PragmaPolicy, seeded_rng};
use hlsfuzz_ir::ProgramGraph;
use hlsfuzz_utils::{Error, FuzzResult};

/// A program copy together with its pragma decisions.
#[derive(Debug)]
pub struct AnnotatedProgram {
    pub graph: ProgramGraph,
    /// Target clock period in nanoseconds.
    pub clock_period: u32,
}

/// Produces two structurally identical copies of a graph whose loop pragmas
/// and clock periods are drawn independently.
///
/// Copy `k` (1 or 2) of seed `s` draws its pragmas from seed `2s + k` and its
/// clock period from seed `3s + k`.
#[derive(Debug, Clone, Default)]
pub struct DifferentialInjector<P> {
    policy: P,
}

impl<P: PragmaPolicy> DifferentialInjector<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn inject(
        &self,
        graph: &ProgramGraph,
        seed: u64,
    ) -> FuzzResult<(AnnotatedProgram, AnnotatedProgram)> {
        let first = self.annotate_copy(graph, seed, 1)?;
        let second = self.annotate_copy(graph, seed, 2)?;
        log::debug!(
            "Injected pragmas: clock periods {}ns and {}ns",
            first.clock_period,
            second.clock_period
        );
        Ok((first, second))
    }

    fn annotate_copy(
        &self,
        graph: &ProgramGraph,
        seed: u64,
        copy: u64,
    ) -> FuzzResult<AnnotatedProgram> {
        let mut copied = graph.deep_clone();
        if copied.node_count() != graph.node_count()
            || copied.edge_count() != graph.edge_count()
        {
            return Err(Error::malformed_structure(format!(
                "copy {copy} has {} nodes and {} edges, expected {} and {}",
                copied.node_count(),
                copied.edge_count(),
                graph.node_count(),
                graph.edge_count()
            )));
        }
        let mut pragma_rng =
            seeded_rng(seed.wrapping_mul(2).wrapping_add(copy));
        self.policy.annotate(&mut copied, &mut pragma_rng)?;
        let mut clock_rng = seeded_rng(seed.wrapping_mul(3).wrapping_add(copy));
        let clock_period = self.policy.clock_period(&mut clock_rng);
        Ok(AnnotatedProgram {
            graph: copied,
            clock_period,
        })
    }
}
