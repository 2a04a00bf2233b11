//! Optimisation passes.

mod initial;
mod peephole;
mod redundancy;
mod synthesis;

pub use initial::SimplifyInitial;
pub use redundancy::RemoveRedundancies;
pub use synthesis::{FullPeepholeOptimise, SynthesiseIqm};
