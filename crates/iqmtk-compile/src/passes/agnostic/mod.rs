//! Target-agnostic compilation passes.
//!
//! These passes operate purely on the DAG structure without consulting
//! the device. They are safe to run on any circuit.

pub mod measures;
pub mod optimization;
pub mod structure;

pub use measures::DelayMeasures;
pub use optimization::{
    FullPeepholeOptimise, RemoveRedundancies, SimplifyInitial, SynthesiseIqm,
};
pub use structure::{DecomposeBoxes, FlattenRegisters, RemoveBarriers};
