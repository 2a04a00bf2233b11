//! Operations placed on circuit wires.

use serde::{Deserialize, Serialize};

use crate::gate::{ClassicalCondition, Gate};
use crate::qubit::{ClbitId, QubitId};

/// What an [`Instruction`] does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    Gate(Gate),
    /// Single-qubit readout into one bit.
    Measure,
    /// Return the qubit to |0⟩.
    Reset,
    /// Ordering constraint with no physical effect.
    Barrier,
}

/// An operation together with the wires it acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub qubits: Vec<QubitId>,
    /// Bits written by the operation. Only measurements write bits;
    /// condition bits live on the gate.
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    fn on(kind: InstructionKind, qubits: Vec<QubitId>, clbits: Vec<ClbitId>) -> Self {
        Self {
            kind,
            qubits,
            clbits,
        }
    }

    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self::on(
            InstructionKind::Gate(gate.into()),
            qubits.into_iter().collect(),
            Vec::new(),
        )
    }

    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self::on(InstructionKind::Measure, vec![qubit], vec![clbit])
    }

    pub fn reset(qubit: QubitId) -> Self {
        Self::on(InstructionKind::Reset, vec![qubit], Vec::new())
    }

    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self::on(
            InstructionKind::Barrier,
            qubits.into_iter().collect(),
            Vec::new(),
        )
    }

    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self.kind, InstructionKind::Reset)
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    pub fn as_gate(&self) -> Option<&Gate> {
        if let InstructionKind::Gate(g) = &self.kind {
            Some(g)
        } else {
            None
        }
    }

    pub fn gate_mut(&mut self) -> Option<&mut Gate> {
        if let InstructionKind::Gate(g) = &mut self.kind {
            Some(g)
        } else {
            None
        }
    }

    /// Condition of a classically controlled gate.
    pub fn condition(&self) -> Option<&ClassicalCondition> {
        self.as_gate()?.condition.as_ref()
    }

    /// Every classical wire the instruction touches, written bits first and
    /// then condition bits, without repeats.
    pub fn classical_wires(&self) -> Vec<ClbitId> {
        let mut wires = self.clbits.clone();
        let extra = self.condition().map(|c| c.bits.as_slice()).unwrap_or_default();
        for bit in extra {
            if !wires.contains(bit) {
                wires.push(*bit);
            }
        }
        wires
    }

    /// Lower-case operation name as sent to the device.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
        }
    }
}
