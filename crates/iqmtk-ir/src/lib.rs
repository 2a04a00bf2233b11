//! iqmtk Circuit Intermediate Representation
//!
//! This crate provides the circuit data structures shared by the compiler,
//! the backend abstraction and the IQM adapter.
//!
//! # Overview
//!
//! Circuits are stored as a DAG ([`CircuitDag`]) with one input and one output
//! node per wire. The [`Circuit`] type wraps the DAG with a fluent builder API
//! and a JSON form ([`CircuitSpec`]) used by the command-line tool.
//!
//! # Core Components
//!
//! - **Bits**: [`QubitId`], [`ClbitId`] and the register slots [`Qubit`], [`Clbit`]
//! - **Gates**: [`StandardGate`] including the IQM-native `PRX`, and
//!   [`CircuitBox`] for named sub-circuits
//! - **Parameters**: [`ParameterExpression`] for symbolic angles
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`] high-level builder API
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use iqmtk_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Parameterized Circuit
//!
//! ```rust
//! use iqmtk_ir::{Circuit, ParameterExpression, QubitId};
//! use std::collections::BTreeMap;
//!
//! let mut circuit = Circuit::with_size("variational", 1, 0);
//! circuit.rx(ParameterExpression::symbol("theta"), QubitId(0)).unwrap();
//! assert!(circuit.is_symbolic());
//!
//! let values = BTreeMap::from([("theta".to_string(), 0.25)]);
//! let bound = circuit.bind_parameters(&values).unwrap();
//! assert!(!bound.is_symbolic());
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;
pub mod spec;

pub use circuit::Circuit;
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use gate::{CircuitBox, ClassicalCondition, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{BinaryOp, ParameterExpression};
pub use qubit::{
    Clbit, ClbitId, DEFAULT_CLBIT_REGISTER, DEFAULT_QUBIT_REGISTER, NODE_REGISTER, Qubit, QubitId,
};
pub use spec::{BitSpec, BoxSpec, CircuitSpec, ConditionSpec, OpSpec, ParamSpec};
