//! iqmtk Compilation Framework
//!
//! This crate lowers circuits to what an IQM device executes: PRX and CZ
//! gates on coupled physical qubits, followed by final measurements. It
//! implements a pass-based architecture where each pass rewrites the
//! circuit DAG and shares results with later passes through a
//! [`PropertySet`].
//!
//! # Overview
//!
//! The default pipeline built by [`PassManagerBuilder`]:
//! 1. **Structure**: inline boxes, flatten registers, drop barriers
//! 2. **Optimisation**: rebase (level 0), local re-synthesis (level 1) or
//!    peephole optimisation to a fixpoint (level 2)
//! 3. **Mapping**: place logical qubits on device nodes and insert SWAPs
//! 4. **Cleanup**: move measurements to the end, rebase again, remove
//!    redundant gates and, from level 1, simplify the known initial state
//!
//! ```text
//! Input Circuit
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (initial/final layout)
//! └─────────────┘
//!       │
//!       ├── DecomposeBoxes / FlattenRegisters / RemoveBarriers
//!       ├── IqmRebase | SynthesiseIqm | FullPeepholeOptimise
//!       ├── DefaultMapping (Placement + Routing)
//!       └── DelayMeasures / IqmRebase / RemoveRedundancies / SimplifyInitial
//!       │
//!       ▼
//! Output Circuit (PRX + CZ on device nodes)
//! ```
//!
//! # Example: Compiling for a Device
//!
//! ```rust
//! use iqmtk_compile::{Architecture, PassManagerBuilder, iqm_required_predicates};
//! use iqmtk_ir::Circuit;
//!
//! let arch = Architecture::star(5);
//! let pm = PassManagerBuilder::new()
//!     .with_optimisation_level(2)
//!     .with_architecture(arch.clone())
//!     .build()
//!     .unwrap();
//!
//! let mut circuit = Circuit::bell().unwrap();
//! pm.apply(&mut circuit).unwrap();
//!
//! assert!(iqm_required_predicates(&arch).iter().all(|p| p.verify(&circuit)));
//! ```
//!
//! # Optimisation Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | Rebase + mapping |
//! | 1 | + single-qubit re-synthesis, initial-state simplification |
//! | 2 | + CZ cancellation and re-synthesis to a fixpoint |
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use iqmtk_compile::{Pass, PassKind, CompileResult, PropertySet};
//! use iqmtk_ir::CircuitDag;
//!
//! struct MyCustomPass;
//!
//! impl Pass for MyCustomPass {
//!     fn name(&self) -> &str { "my_custom_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut CircuitDag, props: &mut PropertySet) -> CompileResult<()> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod decompose;
pub mod error;
pub mod manager;
pub mod pass;
pub mod postprocess;
pub mod predicate;
pub mod property;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder, Repeat};
pub use pass::{Pass, PassKind};
pub use postprocess::{ClassicalOp, PostProcessing, prepare_circuit};
pub use predicate::{
    Connectivity, GateSet, MaxQubits, NoBarriers, NoClassicalControl, NoFastFeedforward,
    NoMidMeasure, NoSymbols, Predicate, first_failure, iqm_gate_set, iqm_required_predicates,
};
pub use property::{Architecture, BasisGates, Layout, PropertySet};
