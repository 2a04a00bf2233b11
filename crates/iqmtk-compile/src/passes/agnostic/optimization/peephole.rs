//! Single sweep peephole rewriting shared by the optimisation passes.

use iqmtk_ir::{CircuitDag, Instruction, QubitId, StandardGate, WireId};
use rustc_hash::FxHashMap;

use crate::decompose::{prx, unitary_to_prx};
use crate::error::CompileResult;
use crate::unitary::{EPSILON, Unitary2x2};

/// How runs of single-qubit gates are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OneQubitMerge {
    /// Leave single-qubit gates alone.
    None,
    /// Fuse adjacent PRX gates that rotate about the same axis.
    SameAxis,
    /// Multiply runs of bound gates and resynthesise them as PRX.
    Unitary,
}

/// A peephole sweep configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Peephole {
    pub merge: OneQubitMerge,
    pub cancel_pairs: bool,
}

enum Slot {
    Inst(Instruction),
    Run { qubit: QubitId, unitary: Unitary2x2 },
    Removed,
}

/// Working state of one sweep: output slots plus, per wire, the stack of
/// live slots touching it with the most recent on top.
#[derive(Default)]
struct Sweep {
    slots: Vec<Slot>,
    fronts: FxHashMap<WireId, Vec<usize>>,
}

impl Sweep {
    fn top(&self, wire: WireId) -> Option<usize> {
        self.fronts.get(&wire).and_then(|s| s.last().copied())
    }

    fn push(&mut self, slot: Slot, wires: &[WireId]) {
        let idx = self.slots.len();
        for &w in wires {
            self.fronts.entry(w).or_default().push(idx);
        }
        self.slots.push(slot);
    }

    fn remove_top(&mut self, idx: usize, wires: &[WireId]) {
        for w in wires {
            if let Some(stack) = self.fronts.get_mut(w) {
                if stack.last() == Some(&idx) {
                    stack.pop();
                }
            }
        }
        self.slots[idx] = Slot::Removed;
    }

    /// Top slot on a qubit, discarding runs that multiplied out to identity.
    fn live_top(&mut self, qubit: QubitId) -> Option<usize> {
        let wire = WireId::Qubit(qubit);
        loop {
            let idx = self.top(wire)?;
            match &self.slots[idx] {
                Slot::Run { unitary, .. } if unitary.is_identity() => {
                    self.remove_top(idx, &[wire]);
                }
                _ => return Some(idx),
            }
        }
    }
}

fn wires_of(inst: &Instruction) -> Vec<WireId> {
    inst.qubits
        .iter()
        .map(|&q| WireId::Qubit(q))
        .chain(inst.classical_wires().into_iter().map(WireId::Clbit))
        .collect()
}

/// The standard gate of an unconditioned gate instruction.
fn plain_gate(inst: &Instruction) -> Option<&StandardGate> {
    let gate = inst.as_gate()?;
    if gate.condition.is_some() {
        return None;
    }
    gate.as_standard()
}

fn numeric_prx(gate: &StandardGate) -> Option<(f64, f64)> {
    match gate {
        StandardGate::PRX(theta, phi) => Some((theta.as_f64()?, phi.as_f64()?)),
        _ => None,
    }
}

impl Peephole {
    /// Run one sweep over `dag` and return the rewritten DAG.
    pub(crate) fn apply(&self, dag: &CircuitDag) -> CompileResult<CircuitDag> {
        let mut sweep = Sweep::default();

        for inst in dag.instructions() {
            let absorbed = match self.merge {
                OneQubitMerge::None => false,
                OneQubitMerge::SameAxis => Self::merge_same_axis(&mut sweep, inst),
                OneQubitMerge::Unitary => Self::merge_unitary(&mut sweep, inst),
            };
            if absorbed || (self.cancel_pairs && Self::cancel_pair(&mut sweep, inst)) {
                continue;
            }
            sweep.push(Slot::Inst(inst.clone()), &wires_of(inst));
        }

        let mut out = dag.empty_like();
        for slot in sweep.slots {
            match slot {
                Slot::Inst(inst) => {
                    out.apply(inst)?;
                }
                Slot::Run { qubit, unitary } => {
                    for g in unitary_to_prx(&unitary) {
                        out.apply(Instruction::gate(g, [qubit]))?;
                    }
                }
                Slot::Removed => {}
            }
        }
        Ok(out)
    }

    fn merge_unitary(sweep: &mut Sweep, inst: &Instruction) -> bool {
        let Some(gate) = plain_gate(inst) else {
            return false;
        };
        let (Some(m), &[qubit]) = (Unitary2x2::from_gate(gate), inst.qubits.as_slice()) else {
            return false;
        };

        let wire = WireId::Qubit(qubit);
        if let Some(idx) = sweep.top(wire) {
            if let Slot::Run { unitary, .. } = &mut sweep.slots[idx] {
                *unitary = m * *unitary;
                return true;
            }
        }
        sweep.push(Slot::Run { qubit, unitary: m }, &[wire]);
        true
    }

    fn merge_same_axis(sweep: &mut Sweep, inst: &Instruction) -> bool {
        let Some((theta, phi)) = plain_gate(inst).and_then(numeric_prx) else {
            return false;
        };
        let &[qubit] = inst.qubits.as_slice() else {
            return false;
        };
        if Unitary2x2::normalize_angle(theta).abs() < EPSILON {
            return true;
        }

        let wire = WireId::Qubit(qubit);
        let Some(idx) = sweep.top(wire) else {
            return false;
        };
        let Slot::Inst(prev) = &sweep.slots[idx] else {
            return false;
        };
        let Some((prev_theta, prev_phi)) = plain_gate(prev).and_then(numeric_prx) else {
            return false;
        };

        // PRX(θ, φ + π) = PRX(−θ, φ)
        let total = if Unitary2x2::normalize_angle(phi - prev_phi).abs() < EPSILON {
            prev_theta + theta
        } else if (Unitary2x2::normalize_angle(phi - prev_phi).abs() - std::f64::consts::PI).abs()
            < EPSILON
        {
            prev_theta - theta
        } else {
            return false;
        };

        let total = Unitary2x2::normalize_angle(total);
        if total.abs() < EPSILON {
            sweep.remove_top(idx, &[wire]);
        } else {
            sweep.slots[idx] = Slot::Inst(Instruction::gate(prx(total, prev_phi), [qubit]));
        }
        true
    }

    fn cancel_pair(sweep: &mut Sweep, inst: &Instruction) -> bool {
        let Some(gate) = plain_gate(inst) else {
            return false;
        };
        let &[a, b] = inst.qubits.as_slice() else {
            return false;
        };
        if !matches!(gate, StandardGate::CX | StandardGate::CZ) {
            return false;
        }

        let (Some(ta), Some(tb)) = (sweep.live_top(a), sweep.live_top(b)) else {
            return false;
        };
        if ta != tb {
            return false;
        }
        let Slot::Inst(prev) = &sweep.slots[ta] else {
            return false;
        };
        let Some(prev_gate) = plain_gate(prev) else {
            return false;
        };
        let cancels = match (gate, prev_gate) {
            (StandardGate::CX, StandardGate::CX) => prev.qubits == inst.qubits,
            (StandardGate::CZ, StandardGate::CZ) => true,
            _ => false,
        };
        if cancels {
            sweep.remove_top(ta, &[WireId::Qubit(a), WireId::Qubit(b)]);
        }
        cancels
    }
}
