//! Classical post-processing of measurement results.
//!
//! Gates sitting directly in front of final measurements can often be
//! replaced by classical operations on the outcomes: a bit flip becomes a
//! flip of the measured bit, a diagonal gate has no effect on the outcome
//! at all, and a CX between two measured qubits becomes an XOR of their
//! bits. [`prepare_circuit`] strips such gates and returns the classical
//! program that restores the original outcome distribution.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use iqmtk_ir::{Circuit, CircuitDag, ClbitId, Instruction, NodeIndex, StandardGate, WireId};

use crate::error::CompileResult;
use crate::unitary::{EPSILON, Unitary2x2};

/// One classical operation on a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClassicalOp {
    /// Invert `bit`.
    Flip { bit: ClbitId },
    /// `target ^= source`.
    Xor { source: ClbitId, target: ClbitId },
}

/// Classical operations applied to every shot, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostProcessing {
    ops: Vec<ClassicalOp>,
}

impl PostProcessing {
    /// An empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a list of operations.
    pub fn from_ops(ops: Vec<ClassicalOp>) -> Self {
        Self { ops }
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[ClassicalOp] {
        &self.ops
    }

    /// Check whether the program does nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the program to one shot. `columns[i]` is the bit stored in
    /// `shot[i]`; operations on bits without a column are skipped.
    pub fn apply(&self, shot: &mut [u8], columns: &[ClbitId]) {
        let col = |bit: ClbitId| columns.iter().position(|&c| c == bit);
        for op in &self.ops {
            match *op {
                ClassicalOp::Flip { bit } => {
                    if let Some(i) = col(bit) {
                        shot[i] ^= 1;
                    }
                }
                ClassicalOp::Xor { source, target } => {
                    if let (Some(s), Some(t)) = (col(source), col(target)) {
                        shot[t] ^= shot[s];
                    }
                }
            }
        }
    }
}

/// What a gate in front of measurements turns into.
enum Strip {
    Drop,
    Flip,
    Xor,
}

fn classify(inst: &Instruction) -> Option<Strip> {
    let gate = inst.as_gate().filter(|g| g.condition.is_none())?;
    let std = gate.as_standard()?;
    if std.is_parameterized() {
        return None;
    }
    match (std, inst.qubits.len()) {
        (StandardGate::CX, 2) => Some(Strip::Xor),
        (g, 2) if g.is_diagonal() => Some(Strip::Drop),
        (g, 1) => {
            let u = Unitary2x2::from_gate(g)?;
            let off = u.data[1].norm() < EPSILON && u.data[2].norm() < EPSILON;
            let diag = u.data[0].norm() < EPSILON && u.data[3].norm() < EPSILON;
            if off {
                Some(Strip::Drop)
            } else if diag {
                Some(Strip::Flip)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// The bit a qubit is finally measured into, if the next operation on the
/// qubit after `node` is a measurement that nothing follows.
fn measured_next(dag: &CircuitDag, node: NodeIndex, inst: &Instruction) -> Option<Vec<ClbitId>> {
    inst.qubits
        .iter()
        .map(|&q| {
            let next = dag.next_on_wire(node, WireId::Qubit(q))?;
            let m = dag.get_instruction(next)?;
            if !(m.is_measure() && dag.is_last_on_wires(next)) {
                return None;
            }
            m.clbits.first().copied()
        })
        .collect()
}

/// Strip gates in front of final measurements.
///
/// Returns the reduced circuit together with the classical program that
/// maps its outcomes to outcomes of `circuit`. Conditional and symbolic
/// gates are never stripped.
pub fn prepare_circuit(circuit: &Circuit) -> CompileResult<(Circuit, PostProcessing)> {
    let mut dag = circuit.dag().clone();
    let mut ops = Vec::new();

    loop {
        let mut stripped = FxHashSet::default();
        let mut round = Vec::new();
        for (node, inst) in dag.topological_ops() {
            let Some(kind) = classify(inst) else {
                continue;
            };
            let Some(bits) = measured_next(&dag, node, inst) else {
                continue;
            };
            match (kind, bits.as_slice()) {
                (Strip::Drop, _) => {}
                (Strip::Flip, &[bit]) => round.push(ClassicalOp::Flip { bit }),
                (Strip::Xor, &[source, target]) => round.push(ClassicalOp::Xor { source, target }),
                _ => continue,
            }
            stripped.insert(node);
        }
        if stripped.is_empty() {
            break;
        }

        // Gates stripped now precede everything stripped before them.
        round.append(&mut ops);
        ops = round;

        let mut next = dag.empty_like();
        for (node, inst) in dag.topological_ops() {
            if !stripped.contains(&node) {
                next.apply(inst.clone())?;
            }
        }
        dag = next;
    }

    Ok((
        Circuit::from_dag(circuit.name(), dag),
        PostProcessing::from_ops(ops),
    ))
}
