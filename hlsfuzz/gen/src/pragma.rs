use crate::FuzzRng;
use hlsfuzz_ir::{LoopPragmas, ProgramGraph};
use hlsfuzz_utils::{Error, FuzzResult};
use rand::{Rng, seq::SliceRandom};

/// Decides the scheduling pragmas and the target clock of one program copy.
pub trait PragmaPolicy {
    /// Overwrite the pragmas of a single loop.
    fn assign_loop(&self, pragmas: &mut LoopPragmas, rng: &mut FuzzRng);

    /// Target clock period in nanoseconds.
    fn clock_period(&self, rng: &mut FuzzRng) -> u32;

    /// Assign pragmas to every loop of `graph`, in creation order.
    fn annotate(
        &self,
        graph: &mut ProgramGraph,
        rng: &mut FuzzRng,
    ) -> FuzzResult<()> {
        for l in graph.loops() {
            let node = graph.loop_node_mut(l)?;
            self.assign_loop(&mut node.pragmas, rng);
            node.check_pragma_status()?;
            log::trace!("Loop `{}`: {:?}", node.name, node.pragmas);
        }
        Ok(())
    }
}

/// Flips a fair coin for each pragma.
///
/// An unrolled loop is fully unrolled on a second coin flip; otherwise its
/// factor is drawn from `unroll_factors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPragmaPolicy {
    unroll_factors: Vec<u32>,
    clock_periods: Vec<u32>,
}

impl Default for RandomPragmaPolicy {
    fn default() -> Self {
        Self {
            unroll_factors: vec![2, 4, 8, 16, 32],
            clock_periods: (1..=10).collect(),
        }
    }
}

impl RandomPragmaPolicy {
    pub fn new(
        unroll_factors: Vec<u32>,
        clock_periods: Vec<u32>,
    ) -> FuzzResult<Self> {
        if unroll_factors.is_empty() || clock_periods.is_empty() {
            return Err(Error::invalid_argument(
                "unroll factors and clock periods must not be empty",
            ));
        }
        if let Some(f) = unroll_factors.iter().find(|f| **f < 2) {
            return Err(Error::invalid_argument(format!(
                "partial unroll factor {f} must be greater than 1"
            )));
        }
        if clock_periods.contains(&0) {
            return Err(Error::invalid_argument(
                "clock period must be positive",
            ));
        }
        Ok(Self {
            unroll_factors,
            clock_periods,
        })
    }

    pub fn unroll_factors(&self) -> &[u32] {
        &self.unroll_factors
    }

    pub fn clock_periods(&self) -> &[u32] {
        &self.clock_periods
    }
}

impl PragmaPolicy for RandomPragmaPolicy {
    fn assign_loop(&self, pragmas: &mut LoopPragmas, rng: &mut FuzzRng) {
        pragmas.pipelined = rng.r#gen();
        pragmas.flattened = rng.r#gen();
        pragmas.unrolled = rng.r#gen();
        pragmas.fully_unrolled = pragmas.unrolled && rng.r#gen();
        pragmas.unroll_factor = if pragmas.unrolled && !pragmas.fully_unrolled {
            self.unroll_factors.choose(rng).copied().unwrap_or(2)
        } else {
            1
        };
    }

    fn clock_period(&self, rng: &mut FuzzRng) -> u32 {
        self.clock_periods.choose(rng).copied().unwrap_or(1)
    }
}
