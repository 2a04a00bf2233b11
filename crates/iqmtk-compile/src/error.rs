//! Error types for compilation.

use iqmtk_ir::{IrError, QubitId};
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR layer.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// The circuit needs more qubits than the target has.
    #[error("Circuit has {required} qubits but target only has {available}")]
    CircuitTooLarge {
        /// Qubits in the circuit.
        required: usize,
        /// Qubits on the target.
        available: u32,
    },

    /// No path between two physical qubits.
    #[error("Routing failed: no path between physical qubits {qubit1} and {qubit2}")]
    RoutingFailed {
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// Routing needs a layout but none was computed.
    #[error("No initial layout; run placement first")]
    MissingLayout,

    /// A gate cannot be expressed in the target gate set.
    #[error("Gate '{0}' cannot be rebased to the IQM gate set")]
    UnsupportedGate(String),

    /// Gate acts on more qubits than the pass handles.
    #[error("Gate '{gate}' acts on {num_qubits} qubits; at most 2 supported here")]
    TooManyQubits {
        /// Gate name.
        gate: String,
        /// Qubits it acts on.
        num_qubits: usize,
    },

    /// A parameter is still symbolic where a number is required.
    #[error("Gate '{gate}' has unbound parameter(s); bind symbols before compiling")]
    SymbolicParameter {
        /// Gate name.
        gate: String,
    },

    /// A measurement cannot be moved to the end of the circuit.
    #[error("Measurement on {qubit} is followed by dependent operation '{op}'")]
    MidCircuitMeasurement {
        /// The measured qubit.
        qubit: QubitId,
        /// Name of the blocking operation.
        op: String,
    },

    /// Optimisation level out of range.
    #[error("Optimisation level must be 0, 1 or 2, got {0}")]
    InvalidOptimisationLevel(u8),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
