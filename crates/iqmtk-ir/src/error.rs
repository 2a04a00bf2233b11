//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit{}", gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Gate was given the wrong number of parameters.
    #[error("Gate '{gate_name}' takes {expected} parameters, got {got}")]
    ParameterCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// Measurement and reset take one qubit; measurement one bit.
    #[error("Malformed '{0}' instruction: wrong operand count")]
    MalformedInstruction(String),

    /// Gate name is not known.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// Parameter is unbound.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Invalid circuit box.
    #[error("Invalid circuit box '{name}': {reason}")]
    InvalidBox {
        /// Name of the box.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// JSON (de)serialisation failed.
    #[error("Circuit JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[allow(clippy::ref_option)]
fn gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_gate_context() {
        let err = IrError::QubitNotFound {
            qubit: QubitId(7),
            gate_name: Some("cz".into()),
        };
        assert_eq!(err.to_string(), "Qubit q7 not found in circuit (gate: cz)");

        let err = IrError::ClbitNotFound {
            clbit: ClbitId(2),
            gate_name: None,
        };
        assert_eq!(err.to_string(), "Classical bit c2 not found in circuit");
    }
}
