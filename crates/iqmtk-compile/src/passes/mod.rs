//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: Target-agnostic passes that operate purely on DAG structure
//! - [`target`]: Passes that need the device architecture

pub mod agnostic;
pub mod target;

pub use agnostic::{
    DecomposeBoxes, DelayMeasures, FlattenRegisters, FullPeepholeOptimise, RemoveBarriers,
    RemoveRedundancies, SimplifyInitial, SynthesiseIqm,
};
pub use target::{DefaultMapping, IqmRebase, Placement, Routing};
