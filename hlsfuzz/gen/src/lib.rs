//! Randomized construction of program graphs.
//!
//! Everything here is a pure function of an integer seed: the
//! [`RandomGraphBuilder`] grows a [`ProgramGraph`](hlsfuzz_ir::ProgramGraph)
//! through a fixed number of random edits and the [`DifferentialInjector`]
//! turns it into two copies that differ only in their pragmas.
mod builder;
mod differential;
mod pragma;
mod samplers;

pub use builder::{Action, BuilderConfig, RandomGraphBuilder};
pub use differential::{AnnotatedProgram, DifferentialInjector};
pub use pragma::{PragmaPolicy, RandomPragmaPolicy};
pub use samplers::{
    OpDistribution, OpKindSampler, TypeConfig, TypeSampler, WeightedSampler,
    pick_centered,
};

use rand::SeedableRng;

/// The random number generator threaded through every sampler.
pub type FuzzRng = rand_chacha::ChaChaRng;

/// A generator seeded with `seed`.
pub fn seeded_rng(seed: u64) -> FuzzRng {
    FuzzRng::seed_from_u64(seed)
}
